// 该文件是 Shouyu （手语） 项目的一部分。
// src/model/subprocess.rs - 外部关键点检测进程
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

//! # 外部关键点检测进程
//!
//! 手部关键点检测由一个独立的辅助程序完成（例如基于 MediaPipe 的脚本），
//! 通过标准输入输出交换数据：
//!
//! 1. 启动后辅助程序输出一行 `READY`；
//! 2. 每帧写入 `width`、`height`、`channels` 三个小端 `u32`，随后是 RGB 像素；
//! 3. 辅助程序回复一行 JSON：
//!    `{"hands": [{"landmarks": [{"x": 0.1, "y": 0.2}, ...]}], "error": null}`。

use std::{
  io::{BufRead, BufReader, Write},
  process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};

use image::RgbImage;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{LandmarkDetector, LandmarkPoint, RawHand};

const READY_SIGNAL: &str = "READY";

#[derive(Error, Debug)]
pub enum SubprocessLandmarkerError {
  #[error("无法启动关键点检测进程 {program}: {source}")]
  Spawn {
    program: String,
    source: std::io::Error,
  },
  #[error("关键点检测进程未就绪: {0:?}")]
  NotReady(String),
  #[error("关键点检测进程已退出")]
  Closed,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无法解析检测结果: {0}")]
  ParseError(#[from] serde_json::Error),
}

#[derive(Deserialize, Debug)]
struct HandJson {
  landmarks: Vec<LandmarkPoint>,
}

#[derive(Deserialize, Debug)]
struct DetectionJson {
  #[serde(default)]
  hands: Vec<HandJson>,
  #[serde(default)]
  error: Option<String>,
}

/// 解析辅助程序的一行回复，辅助程序报告的错误按未检测到手处理
fn parse_response(line: &str) -> Result<Vec<RawHand>, SubprocessLandmarkerError> {
  let result: DetectionJson = serde_json::from_str(line.trim())?;
  if let Some(error) = result.error {
    warn!("关键点检测进程报告错误: {}", error);
    return Ok(Vec::new());
  }
  Ok(result.hands.into_iter().map(|h| h.landmarks).collect())
}

pub struct SubprocessLandmarker {
  child: Child,
  stdin: ChildStdin,
  stdout: BufReader<ChildStdout>,
}

impl SubprocessLandmarker {
  pub fn spawn<S: AsRef<str>>(program: &str, args: &[S]) -> Result<Self, SubprocessLandmarkerError> {
    info!("启动关键点检测进程: {}", program);
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    let mut child = Command::new(program)
      .args(&args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::inherit())
      .spawn()
      .map_err(|source| SubprocessLandmarkerError::Spawn {
        program: program.to_string(),
        source,
      })?;

    let stdin = child.stdin.take().ok_or(SubprocessLandmarkerError::Closed)?;
    let stdout = child.stdout.take().ok_or(SubprocessLandmarkerError::Closed)?;
    let mut stdout = BufReader::new(stdout);

    let mut ready = String::new();
    stdout.read_line(&mut ready)?;
    if ready.trim() != READY_SIGNAL {
      let _ = child.kill();
      let _ = child.wait();
      return Err(SubprocessLandmarkerError::NotReady(ready));
    }
    info!("关键点检测进程就绪");

    Ok(Self {
      child,
      stdin,
      stdout,
    })
  }

  /// 以空白分隔的命令行启动，例如 `python3 hand_detect.py`
  pub fn from_command_line(command: &str) -> Result<Self, SubprocessLandmarkerError> {
    let mut parts = command.split_whitespace();
    let program = parts
      .next()
      .ok_or_else(|| SubprocessLandmarkerError::NotReady("empty command".to_string()))?;
    let args: Vec<&str> = parts.collect();
    Self::spawn(program, &args)
  }
}

impl LandmarkDetector for SubprocessLandmarker {
  type Error = SubprocessLandmarkerError;

  fn detect(&mut self, image: &RgbImage) -> Result<Vec<RawHand>, Self::Error> {
    let (width, height) = image.dimensions();
    self.stdin.write_all(&width.to_le_bytes())?;
    self.stdin.write_all(&height.to_le_bytes())?;
    self.stdin.write_all(&3u32.to_le_bytes())?;
    self.stdin.write_all(image.as_raw())?;
    self.stdin.flush()?;

    let mut line = String::new();
    if self.stdout.read_line(&mut line)? == 0 {
      return Err(SubprocessLandmarkerError::Closed);
    }
    let hands = parse_response(&line)?;
    debug!("关键点检测进程返回 {} 只手", hands.len());
    Ok(hands)
  }
}

impl Drop for SubprocessLandmarker {
  fn drop(&mut self) {
    if let Err(e) = self.child.kill() {
      debug!("关键点检测进程已结束: {}", e);
    }
    let _ = self.child.wait();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_hands_and_ignores_extra_fields() {
    let line = r#"{"hands": [{"handedness": "Right", "landmarks": [{"x": 0.1, "y": 0.2, "z": -0.03}, {"x": 0.3, "y": 0.4}]}]}"#;
    let hands = parse_response(line).unwrap();
    assert_eq!(hands.len(), 1);
    assert_eq!(hands[0], vec![
      LandmarkPoint::new(0.1, 0.2),
      LandmarkPoint::new(0.3, 0.4)
    ]);
  }

  #[test]
  fn helper_error_means_no_hands() {
    let hands = parse_response(r#"{"hands": [], "error": "camera frame too small"}"#).unwrap();
    assert!(hands.is_empty());
  }

  #[test]
  fn garbage_is_a_parse_error() {
    assert!(matches!(
      parse_response("Traceback (most recent call last):"),
      Err(SubprocessLandmarkerError::ParseError(_))
    ));
  }

  #[test]
  fn missing_program_fails_to_spawn() {
    assert!(matches!(
      SubprocessLandmarker::spawn::<&str>("/nonexistent/landmark-helper", &[]),
      Err(SubprocessLandmarkerError::Spawn { .. })
    ));
  }

  #[cfg(unix)]
  #[test]
  fn talks_to_helper_process() {
    // 2x2 帧: 12 字节头 + 12 字节像素
    let script = r#"echo READY; while [ "$(head -c 24 | wc -c)" -eq 24 ]; do echo '{"hands": [{"landmarks": [{"x": 0.5, "y": 0.5}]}]}'; done"#;
    let mut landmarker = SubprocessLandmarker::spawn("sh", &["-c", script]).unwrap();
    let image = RgbImage::new(2, 2);
    for _ in 0..2 {
      let hands = landmarker.detect(&image).unwrap();
      assert_eq!(hands, vec![vec![LandmarkPoint::new(0.5, 0.5)]]);
    }
  }

  #[cfg(unix)]
  #[test]
  fn helper_must_signal_ready() {
    assert!(matches!(
      SubprocessLandmarker::spawn("sh", &["-c", "echo hello"]),
      Err(SubprocessLandmarkerError::NotReady(_))
    ));
  }
}
