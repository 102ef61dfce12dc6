//! Single-shot HTTP servers standing in for the Docker daemon in tests

use super::chunked::Chunked;
use std::{
    io::{BufRead, BufReader, Read, Write},
    net::TcpListener,
    thread::{self, JoinHandle},
    time::Duration,
};
use url::Url;

/// Head and body of a received request
pub type Received = (String, Vec<u8>);

/// Response with a JSON body
pub fn json_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

/// Read a request from `stream`, and then write `response` after `delay`
pub fn reply<S: Read + Write>(mut stream: S, response: &str, delay: Duration) -> Received {
    let received = {
        let mut reader = BufReader::new(&mut stream);
        let mut head = String::new();
        let mut content_length = 0;
        let mut chunked = false;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                let value = value.trim();
                if key.eq_ignore_ascii_case("content-length") {
                    content_length = value.parse().unwrap();
                }
                if key.eq_ignore_ascii_case("transfer-encoding") {
                    chunked = value.eq_ignore_ascii_case("chunked");
                }
            }
            head.push_str(&line);
        }
        let mut body = Vec::new();
        if chunked {
            Chunked::new(&mut reader).read_to_end(&mut body).unwrap();
        } else {
            body.resize(content_length, 0);
            reader.read_exact(&mut body).unwrap();
        }
        (head, body)
    };
    thread::sleep(delay);
    stream.write_all(response.as_bytes()).unwrap();
    stream.flush().unwrap();
    received
}

/// Serve a single request on a TCP port of localhost
pub fn serve_tcp(response: String, delay: Duration) -> (Url, JoinHandle<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        reply(stream, &response, delay)
    });
    (url, handle)
}

/// Serve a single request on a Unix domain socket in a temporary directory
///
/// The socket is removed when the returned directory is dropped.
#[cfg(unix)]
pub fn serve_unix(
    response: String,
) -> (tempfile::TempDir, std::path::PathBuf, JoinHandle<Received>) {
    use std::os::unix::net::UnixListener;

    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("docker.sock");
    let listener = UnixListener::bind(&socket).unwrap();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        reply(stream, &response, Duration::default())
    });
    (dir, socket, handle)
}
