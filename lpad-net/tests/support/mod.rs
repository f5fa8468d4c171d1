//! Minimal HTTP/1.1 responder for exercising the real client paths.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Clone)]
pub enum Reply {
    /// Status plus full body.
    Body(u16, Vec<u8>),
    /// Advertises `declared` bytes, sends `body`, then holds the connection open.
    Stall { declared: usize, body: Vec<u8> },
    /// Advertises `declared` bytes, sends `body`, then closes the connection.
    Truncate { declared: usize, body: Vec<u8> },
}

type Routes = Arc<Mutex<HashMap<String, Reply>>>;

pub struct TestServer {
    pub base_url: String,
    routes: Routes,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Replaces what `path` serves for requests made from now on.
    pub fn set_route(&self, path: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), reply);
    }
}

pub async fn serve(routes: Vec<(&str, Reply)>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes: Routes = Arc::new(Mutex::new(
        routes
            .into_iter()
            .map(|(path, reply)| (path.to_string(), reply))
            .collect(),
    ));
    let served = Arc::clone(&routes);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let routes = Arc::clone(&served);
            tokio::spawn(async move {
                let _ = handle(stream, &routes).await;
            });
        }
    });
    TestServer {
        base_url: format!("http://{addr}"),
        routes,
    }
}

async fn handle(mut stream: TcpStream, routes: &Routes) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let request = String::from_utf8_lossy(&buf);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let reply = routes.lock().unwrap().get(&path).cloned();
    match reply {
        Some(Reply::Body(status, body)) => {
            write_head(&mut stream, status, body.len()).await?;
            stream.write_all(&body).await?;
        }
        Some(Reply::Stall { declared, body }) => {
            write_head(&mut stream, 200, declared).await?;
            stream.write_all(&body).await?;
            stream.flush().await?;
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Some(Reply::Truncate { declared, body }) => {
            write_head(&mut stream, 200, declared).await?;
            stream.write_all(&body).await?;
        }
        None => {
            write_head(&mut stream, 404, 0).await?;
        }
    }
    stream.shutdown().await
}

async fn write_head(stream: &mut TcpStream, status: u16, len: usize) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {status} X\r\nContent-Length: {len}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(head.as_bytes()).await
}
