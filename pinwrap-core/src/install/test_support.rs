//! Test fixtures: a scripted HTTP server and distribution archives.

use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

// ============================================================================
// Scripted HTTP server
// ============================================================================

/// One canned response. The last reply repeats once the script runs out.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// 200 with the given body.
    Body(Vec<u8>),
    /// 302 to the given location.
    Redirect(String),
    /// Empty response with the given status.
    Status(u16),
    /// Announces `declared` bytes but sends only `body`, then closes.
    Truncated { declared: usize, body: Vec<u8> },
    /// Reads the request and closes without answering.
    HangUp,
    /// Announces `declared` bytes, sends only `body`, then goes silent.
    Stall { declared: usize, body: Vec<u8> },
}

/// HTTP/1.1 server on an ephemeral localhost port, one connection per request.
/// Connections are served concurrently so a stalled reply blocks nobody.
pub(crate) struct TestServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub(crate) async fn start(replies: Vec<Reply>) -> Self {
        assert!(!replies.is_empty(), "script needs at least one reply");

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let paths = Arc::new(Mutex::new(Vec::new()));

        let task = {
            let hits = Arc::clone(&hits);
            let paths = Arc::clone(&paths);
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let index = hits.fetch_add(1, Ordering::SeqCst);
                    let reply = replies[index.min(replies.len() - 1)].clone();

                    let path = read_request_path(&mut socket).await;
                    paths.lock().unwrap().push(path);
                    tokio::spawn(async move {
                        write_reply(&mut socket, &reply).await;
                    });
                }
            })
        };

        Self {
            addr,
            hits,
            paths,
            task,
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Base URL without a trailing slash.
    pub(crate) fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub(crate) fn requested_paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn read_request_path(socket: &mut TcpStream) -> String {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                request.extend_from_slice(&buf[..n]);
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }

    String::from_utf8_lossy(&request)
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string()
}

async fn write_reply(socket: &mut TcpStream, reply: &Reply) {
    let (head, body): (String, &[u8]) = match reply {
        Reply::Body(body) => (
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/zip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            ),
            body.as_slice(),
        ),
        Reply::Redirect(location) => (
            format!(
                "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            ),
            b"".as_slice(),
        ),
        Reply::Status(status) => (
            format!(
                "HTTP/1.1 {status} Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            ),
            b"".as_slice(),
        ),
        Reply::Truncated { declared, body } => (
            format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\nConnection: close\r\n\r\n"
            ),
            body.as_slice(),
        ),
        Reply::Stall { declared, body } => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\nConnection: close\r\n\r\n"
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body).await;
            let _ = socket.flush().await;
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            return;
        }
        Reply::HangUp => {
            let _ = socket.shutdown().await;
            return;
        }
    };

    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(body).await;
    let _ = socket.flush().await;
    let _ = socket.shutdown().await;
}

// ============================================================================
// Distribution archives
// ============================================================================

/// Builds a distribution zip laid out like a real release:
/// `{tool}-{version}/{tool}/wrapper/{tool}-{version}.jar` and
/// `{tool}-{version}/{tool}/wrapper/{tool}-wrapper.jar`.
pub(crate) fn distribution_zip(
    tool: &str,
    version: &str,
    jar: &[u8],
    launcher_jar: &[u8],
) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let root = format!("{tool}-{version}");
    zip.add_directory(format!("{root}/"), options).unwrap();
    zip.add_directory(format!("{root}/{tool}/wrapper/"), options)
        .unwrap();

    zip.start_file(format!("{root}/{tool}/wrapper/{tool}-{version}.jar"), options)
        .unwrap();
    zip.write_all(jar).unwrap();

    zip.start_file(format!("{root}/{tool}/wrapper/{tool}-wrapper.jar"), options)
        .unwrap();
    zip.write_all(launcher_jar).unwrap();

    zip.finish().unwrap().into_inner()
}

/// Bytes that look like the start of a zip but have no central directory.
pub(crate) fn corrupt_zip() -> Vec<u8> {
    b"PK\x03\x04this archive was cut short".to_vec()
}
