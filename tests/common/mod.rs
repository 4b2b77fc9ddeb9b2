//! Shared mock endpoints for integration tests: a scripted control
//! port daemon, canned-JSON IP lookup servers, a request-capture
//! server, and a minimal SOCKS5 relay so proxied requests resolve to
//! a test-owned endpoint.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Handle to a running mock control daemon
pub struct MockControl {
    pub addr: SocketAddr,
    commands: Arc<Mutex<Vec<String>>>,
}

impl MockControl {
    /// Every command line received, in order
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Number of received commands starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.commands()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

/// Spawn a control daemon that accepts `expected_password` and, when
/// `rotate_target` is given, rewrites it to a fresh address on every
/// NEWNYM (simulating a successful circuit rotation).
pub async fn spawn_control(
    expected_password: &str,
    rotate_target: Option<Arc<Mutex<String>>>,
) -> MockControl {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let commands = Arc::new(Mutex::new(Vec::new()));
    let expected_auth = format!("AUTHENTICATE \"{}\"", expected_password);
    let rotate = rotate_target.map(|ip| (ip, Arc::new(AtomicUsize::new(0))));

    {
        let commands = commands.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(handle_control(
                    stream,
                    expected_auth.clone(),
                    commands.clone(),
                    rotate.clone(),
                ));
            }
        });
    }

    MockControl { addr, commands }
}

async fn handle_control(
    stream: TcpStream,
    expected_auth: String,
    commands: Arc<Mutex<Vec<String>>>,
    rotate: Option<(Arc<Mutex<String>>, Arc<AtomicUsize>)>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim_end().to_string();
        if line.is_empty() {
            continue;
        }
        commands.lock().unwrap().push(line.clone());

        let reply: &str = if line.starts_with("AUTHENTICATE") {
            if line == expected_auth {
                "250 OK\r\n"
            } else {
                "515 Authentication failed\r\n"
            }
        } else if line == "SIGNAL NEWNYM" {
            if let Some((ip, counter)) = &rotate {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                *ip.lock().unwrap() = format!("10.0.0.{}", n + 2);
            }
            "250 OK\r\n"
        } else if line == "GETINFO version" {
            "250-version=0.4.8.10\r\n250 OK\r\n"
        } else if line == "GETINFO status/bootstrap-phase" {
            "250-status/bootstrap-phase=NOTICE BOOTSTRAP PROGRESS=100 TAG=done SUMMARY=\"Done\"\r\n250 OK\r\n"
        } else if line == "GETINFO circuit-status" {
            "250+circuit-status=\r\n8 BUILT $AAAA~relay PURPOSE=GENERAL\r\n12 BUILT $BBBB~relay PURPOSE=GENERAL\r\n.\r\n250 OK\r\n"
        } else if line.starts_with("CLOSECIRCUIT") {
            "250 OK\r\n"
        } else {
            "510 Unrecognized command\r\n"
        };

        if write_half.write_all(reply.as_bytes()).await.is_err() {
            break;
        }
    }
}

/// Spawn a lookup server replying `{"ip": "<current value>"}` and
/// counting hits
pub async fn spawn_lookup(ip: Arc<Mutex<String>>, hits: Arc<AtomicUsize>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let ip = ip.clone();
            let hits = hits.clone();
            tokio::spawn(async move {
                if read_request(&mut stream).await.is_err() {
                    return;
                }
                hits.fetch_add(1, Ordering::SeqCst);
                let body = format!("{{\"ip\":\"{}\"}}", ip.lock().unwrap());
                let _ = write_json_response(&mut stream, &body).await;
            });
        }
    });

    addr
}

/// Spawn a lookup server replying a fixed JSON body
pub async fn spawn_lookup_with_body(body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                if read_request(&mut stream).await.is_err() {
                    return;
                }
                let _ = write_json_response(&mut stream, body).await;
            });
        }
    });

    addr
}

/// A request as observed by the capture server
pub struct CapturedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

/// Spawn a server recording every request and replying `{"ok":true}`
pub async fn spawn_capture(captured: Arc<Mutex<Vec<CapturedRequest>>>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let captured = captured.clone();
            tokio::spawn(async move {
                let Ok((head, body)) = read_request(&mut stream).await else {
                    return;
                };
                captured.lock().unwrap().push(CapturedRequest { head, body });
                let _ = write_json_response(&mut stream, "{\"ok\":true}").await;
            });
        }
    });

    addr
}

/// Spawn a SOCKS5 relay that accepts any no-auth CONNECT and pipes the
/// stream to `upstream`, ignoring the requested target
pub async fn spawn_socks(upstream: SocketAddr) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut client, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                if socks_handshake(&mut client).await.is_err() {
                    return;
                }
                let Ok(mut up) = TcpStream::connect(upstream).await else {
                    return;
                };
                let _ = tokio::io::copy_bidirectional(&mut client, &mut up).await;
            });
        }
    });

    addr
}

async fn socks_handshake(stream: &mut TcpStream) -> std::io::Result<()> {
    // greeting: VER NMETHODS METHODS...
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).await?;
    let mut methods = vec![0u8; header[1] as usize];
    stream.read_exact(&mut methods).await?;
    stream.write_all(&[0x05, 0x00]).await?;

    // request: VER CMD RSV ATYP <addr> <port>
    let mut request = [0u8; 4];
    stream.read_exact(&mut request).await?;
    match request[3] {
        0x01 => {
            let mut addr = [0u8; 4];
            stream.read_exact(&mut addr).await?;
        }
        0x03 => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            let mut name = vec![0u8; len[0] as usize];
            stream.read_exact(&mut name).await?;
        }
        0x04 => {
            let mut addr = [0u8; 16];
            stream.read_exact(&mut addr).await?;
        }
        _ => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "unsupported address type",
            ))
        }
    }
    let mut port = [0u8; 2];
    stream.read_exact(&mut port).await?;

    // success, bound to 0.0.0.0:0
    stream
        .write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
        .await
}

/// Read one HTTP request: the full head, then a content-length body
async fn read_request(stream: &mut TcpStream) -> std::io::Result<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed mid-request",
            ));
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > 64 * 1024 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "request head too large",
            ));
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    let mut body = buf[head_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok((head, body))
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

async fn write_json_response(stream: &mut TcpStream, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
