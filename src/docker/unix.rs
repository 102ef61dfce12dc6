//! HTTP/1.1 over the Unix domain socket of the Docker daemon
//!
//! Only what the engine API calls need is spoken. A request is a `POST` whose body is
//! empty, of fixed length, or chunked. A response body is delimited by `Content-Length`,
//! chunked encoding, or the end of the connection.

use super::{chunked::Chunked, Body};
use crate::{engine::LogStream, error::*};
use std::{
    io::{self, BufRead, BufReader, BufWriter, Read, Write},
    os::unix::net::UnixStream,
    path::Path,
};
use url::Url;

const CHUNK_SIZE: usize = 64 * 1024;

/// Status line and framing of a response
#[derive(Debug, PartialEq, Eq)]
struct Head {
    status: u16,
    content_length: Option<u64>,
    chunked: bool,
}

/// Send a `POST` to the daemon listening on `socket`
///
/// Only the path and query of `url` are used. The response body is returned unread
/// when the status is not an error.
pub(crate) fn post(
    socket: &Path,
    url: &Url,
    headers: &[(&str, &str)],
    body: Body,
) -> Result<LogStream> {
    let stream = UnixStream::connect(socket)?;
    write_request(&stream, url, headers, body)?;

    let mut reader = BufReader::new(stream);
    let head = read_head(&mut reader)?;
    let mut body: LogStream = if head.chunked {
        Box::new(Chunked::new(reader))
    } else if let Some(len) = head.content_length {
        Box::new(reader.take(len))
    } else {
        Box::new(reader)
    };
    if head.status >= 400 {
        let mut text = String::new();
        body.read_to_string(&mut text)?;
        return Err(Error::from_response(head.status, &text));
    }
    Ok(body)
}

fn write_request(
    stream: &UnixStream,
    url: &Url,
    headers: &[(&str, &str)],
    body: Body,
) -> io::Result<()> {
    let mut w = BufWriter::new(stream);
    match url.query() {
        Some(query) => write!(w, "POST {}?{} HTTP/1.1\r\n", url.path(), query)?,
        None => write!(w, "POST {} HTTP/1.1\r\n", url.path())?,
    }
    write!(
        w,
        "Host: {}\r\nConnection: close\r\n",
        url.host_str().unwrap_or("localhost")
    )?;
    for (key, value) in headers {
        write!(w, "{}: {}\r\n", key, value)?;
    }
    match body {
        Body::Empty => write!(w, "Content-Length: 0\r\n\r\n")?,
        Body::Json(json) => {
            write!(
                w,
                "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n",
                json.len()
            )?;
            w.write_all(&json)?;
        }
        Body::Tar(mut reader) => {
            write!(w, "Transfer-Encoding: chunked\r\n\r\n")?;
            let mut buf = vec![0; CHUNK_SIZE];
            loop {
                let n = match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                };
                write!(w, "{:x}\r\n", n)?;
                w.write_all(&buf[..n])?;
                w.write_all(b"\r\n")?;
            }
            w.write_all(b"0\r\n\r\n")?;
        }
    }
    w.flush()
}

fn invalid_response(line: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Invalid response from Docker daemon: {:?}", line),
    )
}

fn read_head(reader: &mut impl BufRead) -> io::Result<Head> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    // e.g. `HTTP/1.1 200 OK`
    let status = line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| invalid_response(&line))?;
    let mut head = Head {
        status,
        content_length: None,
        chunked: false,
    };
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Docker daemon closed the connection in the response head",
            ));
        }
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((key, value)) = header.split_once(':') {
            let value = value.trim();
            if key.eq_ignore_ascii_case("content-length") {
                head.content_length = Some(value.parse().map_err(|_| invalid_response(header))?);
            } else if key.eq_ignore_ascii_case("transfer-encoding") {
                head.chunked = value.eq_ignore_ascii_case("chunked");
            }
        }
    }
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::{super::test_daemon::*, *};

    fn url(path: &str) -> Url {
        Url::parse("http://localhost/v1.41/").unwrap().join(path).unwrap()
    }

    fn read(mut stream: LogStream) -> String {
        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn head() {
        let mut input = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\ncontent-length: 42\r\n\r\nbody".as_bytes();
        assert_eq!(
            read_head(&mut input).unwrap(),
            Head {
                status: 200,
                content_length: Some(42),
                chunked: false
            }
        );
        assert_eq!(input, b"body");

        let mut input = "HTTP/1.1 404 Not Found\r\nTransfer-Encoding: chunked\r\n\r\n".as_bytes();
        let head = read_head(&mut input).unwrap();
        assert_eq!(head.status, 404);
        assert!(head.chunked);

        assert!(read_head(&mut "garbage\r\n\r\n".as_bytes()).is_err());
        assert!(read_head(&mut "HTTP/1.1 200 OK\r\nServer: Docker".as_bytes()).is_err());
    }

    #[test]
    fn post_json() {
        let (_dir, socket, server) =
            serve_unix(json_response("200 OK", r#"{"Status":"Login Succeeded"}"#));
        let res = post(&socket, &url("auth"), &[], Body::Json(b"{}".to_vec())).unwrap();
        assert_eq!(read(res), r#"{"Status":"Login Succeeded"}"#);

        let (head, body) = server.join().unwrap();
        assert!(head.starts_with("POST /v1.41/auth HTTP/1.1\r\n"), "{}", head);
        assert!(head.contains("Host: localhost\r\n"), "{}", head);
        assert!(head.contains("Content-Type: application/json\r\n"), "{}", head);
        assert_eq!(body, b"{}");
    }

    #[test]
    fn post_query_and_headers() {
        let (_dir, socket, server) = serve_unix(json_response("200 OK", ""));
        let mut url = url("images/create");
        url.query_pairs_mut()
            .append_pair("fromImage", "docker.io/my/testimage")
            .append_pair("tag", "latest");
        post(&socket, &url, &[("X-Registry-Auth", "token")], Body::Empty).unwrap();

        let (head, body) = server.join().unwrap();
        assert!(
            head.starts_with(
                "POST /v1.41/images/create?fromImage=docker.io%2Fmy%2Ftestimage&tag=latest HTTP/1.1\r\n"
            ),
            "{}",
            head
        );
        assert!(head.contains("X-Registry-Auth: token\r\n"), "{}", head);
        assert!(body.is_empty());
    }

    #[test]
    fn stream_body_is_chunked() {
        let (_dir, socket, server) = serve_unix(json_response("200 OK", ""));
        let context: Box<dyn Read + Send> = Box::new(io::Cursor::new(b"tar archive".to_vec()));
        post(
            &socket,
            &url("build"),
            &[("Content-Type", "application/x-tar")],
            Body::Tar(context),
        )
        .unwrap();

        let (head, body) = server.join().unwrap();
        assert!(head.contains("Transfer-Encoding: chunked\r\n"), "{}", head);
        assert!(head.contains("Content-Type: application/x-tar\r\n"), "{}", head);
        assert_eq!(body, b"tar archive");
    }

    #[test]
    fn chunked_response() {
        let (_dir, socket, server) = serve_unix(
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
             15\r\n{\"status\":\"Pulling\"}\n\r\n\
             12\r\n{\"status\":\"Done\"}\n\r\n\
             0\r\n\r\n"
                .to_string(),
        );
        let res = post(&socket, &url("images/create"), &[], Body::Empty).unwrap();
        assert_eq!(read(res), "{\"status\":\"Pulling\"}\n{\"status\":\"Done\"}\n");
        server.join().unwrap();
    }

    #[test]
    fn response_until_close() {
        let (_dir, socket, server) =
            serve_unix("HTTP/1.1 200 OK\r\n\r\n{\"stream\":\"Step 1/1\"}\n".to_string());
        let res = post(&socket, &url("build"), &[], Body::Empty).unwrap();
        assert_eq!(read(res), "{\"stream\":\"Step 1/1\"}\n");
        server.join().unwrap();
    }

    #[test]
    fn error_status() {
        let (_dir, socket, server) = serve_unix(json_response(
            "404 Not Found",
            r#"{"message":"pull access denied for my/testimage"}"#,
        ));
        match post(&socket, &url("images/create"), &[], Body::Empty) {
            Err(Error::EngineError { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "pull access denied for my/testimage");
            }
            _ => panic!("Must be an engine error"),
        }
        server.join().unwrap();
    }

    #[test]
    fn missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            post(&dir.path().join("docker.sock"), &url("auth"), &[], Body::Empty),
            Err(Error::UnknownIo(_))
        ));
    }
}
