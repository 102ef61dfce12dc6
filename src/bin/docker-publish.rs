use clap::Parser;
use docker_publish::{config::EnvProvider, docker::DockerClient, PublishConfig};
use std::{io, path::PathBuf, process};

/// Build a container image and push it to a registry.
///
/// Inputs are read from `INPUT_NAME`, `INPUT_USERNAME`, `INPUT_PASSWORD`,
/// `INPUT_REGISTRY`, `INPUT_CACHE`, `INPUT_SNAPSHOT`, `INPUT_DOCKERFILE`,
/// `GITHUB_REF`, and `GITHUB_SHA`. The Docker daemon is reached via `DOCKER_HOST`,
/// `unix:///var/run/docker.sock` by default.
#[derive(Debug, Parser)]
#[clap(version)]
struct Opt {
    /// Directory used as the build context
    #[clap(parse(from_os_str), default_value = "./")]
    context: PathBuf,
}

fn run(opt: &Opt) -> docker_publish::Result<()> {
    let build_time = chrono::Local::now().naive_local();
    let config = PublishConfig::resolve(&EnvProvider, build_time)?;
    let mut client = DockerClient::from_env()?;
    match client.socket() {
        Some(socket) => log::debug!("Docker engine API: {} on {}", client.url(), socket.display()),
        None => log::debug!("Docker engine API: {}", client.url()),
    }
    let stdout = io::stdout();
    let mut sink = stdout.lock();
    docker_publish::publish(&mut client, &config, &opt.context, &mut sink)
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();
    if let Err(e) = run(&opt) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
