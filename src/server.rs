// 该文件是 Shouyu （手语） 项目的一部分。
// src/server.rs - MJPEG HTTP 服务
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

//! # MJPEG HTTP 服务
//!
//! - `/`：内嵌视频流的首页
//! - `/video_feed`：`multipart/x-mixed-replace` 视频流
//! - 其他路径返回 404
//!
//! 每个视频流连接在独立线程中处理，并通过工厂函数创建自己的输入源与识别流程，
//! 连接断开时随流一起释放摄像头。工厂函数失败时返回 503。

use std::{
  fmt::Display,
  io::Read,
  net::SocketAddr,
  sync::Arc,
  thread,
};

use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::output::CONTENT_TYPE;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Shouyu</title>
  </head>
  <body style="margin:0;background:#111;display:flex;justify-content:center;align-items:center;height:100vh">
    <img src="/video_feed" alt="video feed">
  </body>
</html>
"#;

#[derive(Error, Debug)]
pub enum ServerError {
  #[error("无法监听地址 {addr}: {source}")]
  Bind {
    addr: String,
    source: Box<dyn std::error::Error + Send + Sync>,
  },
  #[error("无法获取监听地址")]
  NoAddress,
}

#[derive(Debug, PartialEq, Eq)]
enum Route {
  Index,
  VideoFeed,
  NotFound,
}

fn route(method: &Method, url: &str) -> Route {
  if *method != Method::Get {
    return Route::NotFound;
  }
  match url.split('?').next().unwrap_or(url) {
    "/" => Route::Index,
    "/video_feed" => Route::VideoFeed,
    _ => Route::NotFound,
  }
}

fn header(name: &str, value: &str) -> Option<Header> {
  Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

/// 视频流服务
///
/// `factory` 为每个连接创建一个字节流（通常是 [`crate::output::MjpegStream`]）。
pub struct StreamServer<F> {
  server: Arc<Server>,
  factory: Arc<F>,
}

/// 用于从其他线程停止服务
#[derive(Clone)]
pub struct ServerHandle {
  server: Arc<Server>,
}

impl ServerHandle {
  pub fn shutdown(&self) {
    info!("停止 HTTP 服务");
    self.server.unblock();
  }
}

impl<F, R, E> StreamServer<F>
where
  F: Fn() -> Result<R, E> + Send + Sync + 'static,
  R: Read,
  E: Display,
{
  pub fn bind(addr: &str, factory: F) -> Result<Self, ServerError> {
    let server = Server::http(addr).map_err(|source| ServerError::Bind {
      addr: addr.to_string(),
      source,
    })?;
    info!("HTTP 服务监听于 {}", addr);
    Ok(Self {
      server: Arc::new(server),
      factory: Arc::new(factory),
    })
  }

  pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
    self
      .server
      .server_addr()
      .to_ip()
      .ok_or(ServerError::NoAddress)
  }

  pub fn handle(&self) -> ServerHandle {
    ServerHandle {
      server: self.server.clone(),
    }
  }

  /// 处理请求直到 [`ServerHandle::shutdown`] 被调用
  pub fn run(&self) {
    for request in self.server.incoming_requests() {
      debug!("{} {}", request.method(), request.url());
      match route(request.method(), request.url()) {
        Route::Index => {
          let mut response = Response::from_string(INDEX_HTML);
          if let Some(h) = header("Content-Type", "text/html; charset=utf-8") {
            response = response.with_header(h);
          }
          if let Err(e) = request.respond(response) {
            warn!("发送首页失败: {}", e);
          }
        }
        Route::VideoFeed => {
          let factory = self.factory.clone();
          thread::spawn(move || serve_stream(request, factory.as_ref()));
        }
        Route::NotFound => {
          if let Err(e) = request.respond(Response::empty(404)) {
            warn!("发送 404 失败: {}", e);
          }
        }
      }
    }
    info!("HTTP 服务结束");
  }
}

fn serve_stream<F, R, E>(request: Request, factory: &F)
where
  F: Fn() -> Result<R, E>,
  R: Read,
  E: Display,
{
  let peer = request.remote_addr().copied();
  let stream = match factory() {
    Ok(stream) => stream,
    Err(e) => {
      warn!("无法为 {:?} 创建视频流: {}", peer, e);
      if let Err(e) = request.respond(Response::empty(503)) {
        warn!("发送 503 失败: {}", e);
      }
      return;
    }
  };

  info!("开始向 {:?} 推送视频流", peer);
  let headers = header("Content-Type", CONTENT_TYPE).into_iter().collect();
  let response = Response::new(StatusCode(200), headers, stream, None, None);
  match request.respond(response) {
    Ok(()) => info!("视频流结束: {:?}", peer),
    Err(e) => info!("客户端断开: {:?} ({})", peer, e),
  }
}

#[cfg(test)]
mod tests {
  use std::{
    io::{Cursor, Write},
    net::TcpStream,
  };

  use super::*;

  fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    write!(
      stream,
      "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
      path
    )
    .unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    String::from_utf8_lossy(&response).into_owned()
  }

  fn start<F, R, E>(factory: F) -> (SocketAddr, ServerHandle)
  where
    F: Fn() -> Result<R, E> + Send + Sync + 'static,
    R: Read,
    E: Display,
  {
    let server = StreamServer::bind("127.0.0.1:0", factory).unwrap();
    let addr = server.local_addr().unwrap();
    let handle = server.handle();
    thread::spawn(move || server.run());
    (addr, handle)
  }

  #[test]
  fn routes_by_path() {
    assert_eq!(route(&Method::Get, "/"), Route::Index);
    assert_eq!(route(&Method::Get, "/video_feed?t=1"), Route::VideoFeed);
    assert_eq!(route(&Method::Get, "/favicon.ico"), Route::NotFound);
    assert_eq!(route(&Method::Post, "/video_feed"), Route::NotFound);
  }

  #[test]
  fn serves_index_and_404() {
    let (addr, handle) = start(|| Ok::<_, String>(Cursor::new(Vec::new())));
    let index = get(addr, "/");
    assert!(index.starts_with("HTTP/1.1 200"));
    assert!(index.contains("/video_feed"));
    assert!(get(addr, "/nope").starts_with("HTTP/1.1 404"));
    handle.shutdown();
  }

  #[test]
  fn failing_factory_answers_503() {
    let (addr, handle) = start(|| Err::<Cursor<Vec<u8>>, _>("camera busy"));
    assert!(get(addr, "/video_feed").starts_with("HTTP/1.1 503"));
    handle.shutdown();
  }

  #[test]
  fn streams_multipart_body() {
    let body = crate::output::multipart_part(b"jpeg");
    let (addr, handle) = start(move || Ok::<_, String>(Cursor::new(body.clone())));
    let response = get(addr, "/video_feed");
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(CONTENT_TYPE));
    assert!(response.contains("--frame\r\nContent-Type: image/jpeg"));
    handle.shutdown();
  }
}
