// 该文件是 Shouyu （手语） 项目的一部分。
// src/input/gstreamer_input.rs - GStreamer 输入
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

//! # GStreamer 视频输入模块
//!
//! 基于 GStreamer 的摄像头与视频文件输入。管道末端统一转换为 BGR，
//! 与普通摄像头的原生通道顺序一致，由识别管道负责转换为 RGB 并镜像。
//!
//! ## URL 格式
//!
//! - 摄像头: `gst://camera/dev/video0?width=640&height=480&fps=30&format=YUY2`
//! - 视频文件: `gst://file/path/to/video.mp4`
//!
//! ## 系统依赖
//!
//! **Ubuntu/Debian:**
//! ```bash
//! sudo apt-get install libgstreamer1.0-dev libgstreamer-plugins-base1.0-dev
//! ```

use std::collections::HashMap;

use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{ChannelOrder, RawFrame},
  input::FrameSource,
};

/// GStreamer 输入错误类型
#[derive(Error, Debug)]
pub enum GStreamerInputError {
  /// URI scheme 不匹配（期望 "gst://"）
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  /// GStreamer 库错误
  #[error("GStreamer error: {0}")]
  GStreamerError(#[from] gst::glib::Error),
  /// GStreamer 布尔操作错误
  #[error("GStreamer boolean error: {0}")]
  GStreamerBoolError(#[from] gst::glib::BoolError),
  /// 无法获取 appsink 元素
  #[error("Failed to get appsink element")]
  AppSinkNotFound,
  /// 无法转换元素为 appsink
  #[error("Failed to convert element to appsink")]
  AppSinkConversionFailed,
  /// 无法从 caps 获取视频信息
  #[error("Failed to get video info from caps")]
  VideoInfoError,
  /// 不支持的视频格式
  #[error("Unsupported video format")]
  UnsupportedFormat,
  /// 管道错误
  #[error("Pipeline error: {0}")]
  PipelineError(String),
  /// 缓冲区大小不匹配
  #[error("Buffer size mismatch: expected {expected} bytes, got {actual} bytes")]
  BufferSizeMismatch { expected: usize, actual: usize },
  /// 状态改变错误
  #[error("State change error: {0}")]
  StateChangeError(#[from] gst::StateChangeError),
}

pub enum GStreamerInputBuilderItem {
  FileSource(String),
  CameraSource {
    camera: String,
    format: String,
    width: u32,
    height: u32,
    fps: u32,
  },
  TargetFormat {
    format: String,
  },
}

impl GStreamerInputBuilderItem {
  fn to_pipeline(&self) -> String {
    match self {
      GStreamerInputBuilderItem::FileSource(path) => {
        format!("filesrc location={} ! decodebin", path)
      }
      GStreamerInputBuilderItem::CameraSource {
        camera,
        format,
        width,
        height,
        fps,
      } => format!(
        "v4l2src device={} ! video/x-raw,format={},width={},height={},framerate={}/1",
        camera, format, width, height, fps
      ),
      GStreamerInputBuilderItem::TargetFormat { format } => {
        format!("videoconvert ! video/x-raw,format={}", format)
      }
    }
  }
}

/// GStreamer 输入管道构建器
pub struct GStreamerInputPipelineBuilder {
  items: Vec<GStreamerInputBuilderItem>,
}

impl Default for GStreamerInputPipelineBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl GStreamerInputPipelineBuilder {
  pub fn new() -> Self {
    Self { items: Vec::new() }
  }

  pub fn camera(mut self, device: &str, width: u32, height: u32, fps: u32) -> Self {
    self.items.push(GStreamerInputBuilderItem::CameraSource {
      camera: device.to_string(),
      format: "YUY2".to_string(),
      width,
      height,
      fps,
    });
    self
  }

  pub fn file(mut self, path: &str) -> Self {
    self
      .items
      .push(GStreamerInputBuilderItem::FileSource(path.to_string()));
    self
  }

  fn camera_from_query(path: &str, query: &HashMap<String, String>) -> Self {
    let format = query
      .get("format")
      .map(String::from)
      .unwrap_or(String::from("YUY2"));
    let width = query
      .get("width")
      .and_then(|v| v.parse::<u32>().ok())
      .unwrap_or(640);
    let height = query
      .get("height")
      .and_then(|v| v.parse::<u32>().ok())
      .unwrap_or(480);
    let fps = query
      .get("fps")
      .and_then(|v| v.parse::<u32>().ok())
      .unwrap_or(30);

    GStreamerInputPipelineBuilder {
      items: vec![GStreamerInputBuilderItem::CameraSource {
        camera: path.to_string(),
        format,
        width,
        height,
        fps,
      }],
    }
  }

  fn description(&self) -> String {
    let basic_pipeline = self
      .items
      .iter()
      .map(GStreamerInputBuilderItem::to_pipeline)
      .collect::<Vec<String>>()
      .join(" ! ");
    format!(
      "{} ! {} ! appsink max-buffers=1 drop=true name=sink",
      basic_pipeline,
      GStreamerInputBuilderItem::TargetFormat {
        format: "BGR".to_string()
      }
      .to_pipeline()
    )
  }

  pub fn build(self) -> Result<GStreamerInput, GStreamerInputError> {
    gst::init()?;

    let full_pipeline = self.description();
    info!("GStreamer pipeline description: {}", full_pipeline);

    let pipeline = gst::parse::launch(&full_pipeline)?
      .downcast::<gst::Pipeline>()
      .map_err(|_| GStreamerInputError::PipelineError("Failed to create pipeline".to_string()))?;

    let appsink = pipeline
      .by_name("sink")
      .ok_or(GStreamerInputError::AppSinkNotFound)?
      .downcast::<gst_app::AppSink>()
      .map_err(|_| GStreamerInputError::AppSinkConversionFailed)?;

    // 摄像头不可用时在这里立即失败，而不是之后产出黑帧
    pipeline.set_state(gst::State::Playing)?;

    Ok(GStreamerInput { pipeline, appsink })
  }
}

impl FromUrlWithScheme for GStreamerInputPipelineBuilder {
  const SCHEME: &'static str = "gst";
}

impl FromUrl for GStreamerInputPipelineBuilder {
  type Error = GStreamerInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(GStreamerInputError::SchemeMismatch);
    }

    let query: HashMap<String, String> = url
      .query_pairs()
      .map(|(k, v)| (String::from(k), String::from(v)))
      .collect();

    match url.host_str() {
      Some("camera") => Ok(Self::camera_from_query(url.path(), &query)),
      Some("file") => Ok(Self::new().file(url.path())),
      _ => Err(GStreamerInputError::SchemeMismatch),
    }
  }
}

/// GStreamer 视频输入
pub struct GStreamerInput {
  pipeline: gst::Pipeline,
  appsink: gst_app::AppSink,
}

impl Drop for GStreamerInput {
  fn drop(&mut self) {
    if let Err(e) = self.pipeline.set_state(gst::State::Null) {
      warn!("Failed to stop GStreamer pipeline: {}", e);
    }
  }
}

impl FrameSource for GStreamerInput {
  fn next_frame(&mut self) -> Option<RawFrame> {
    let sample = self
      .appsink
      .pull_sample()
      .map_err(|e| warn!("Failed to pull sample: {}", e))
      .ok()?;
    convert_sample(sample)
      .map_err(|e| error!("Failed to fetch sample: {}", e))
      .ok()
  }

  fn is_finished(&self) -> bool {
    self.appsink.is_eos()
  }
}

fn convert_sample(sample: gst::Sample) -> Result<RawFrame, GStreamerInputError> {
  let buffer = sample
    .buffer()
    .ok_or_else(|| GStreamerInputError::PipelineError("No buffer in sample".to_string()))?;
  let caps = sample
    .caps()
    .ok_or_else(|| GStreamerInputError::PipelineError("No caps in sample".to_string()))?;

  let video_info =
    gst_video::VideoInfo::from_caps(caps).map_err(|_| GStreamerInputError::VideoInfoError)?;

  let order = match video_info.format() {
    gst_video::VideoFormat::Bgr => ChannelOrder::Bgr,
    gst_video::VideoFormat::Rgb => ChannelOrder::Rgb,
    _ => return Err(GStreamerInputError::UnsupportedFormat),
  };

  let width = video_info.width();
  let height = video_info.height();
  let row_bytes = width as usize * 3;
  let stride = video_info.stride()[0] as usize;

  let map = buffer.map_readable().map_err(|e| {
    GStreamerInputError::PipelineError(format!("Failed to map buffer for reading: {}", e))
  })?;
  let data = map.as_slice();

  let expected_size = stride * (height as usize).saturating_sub(1) + row_bytes;
  if data.len() < expected_size {
    return Err(GStreamerInputError::BufferSizeMismatch {
      expected: expected_size,
      actual: data.len(),
    });
  }

  // 行可能有对齐填充，逐行拷贝
  let mut pixels = Vec::with_capacity(row_bytes * height as usize);
  for row in data.chunks(stride).take(height as usize) {
    pixels.extend_from_slice(&row[..row_bytes]);
  }

  RawFrame::new(width, height, order, pixels)
    .map_err(|e| GStreamerInputError::PipelineError(e.to_string()))
}
