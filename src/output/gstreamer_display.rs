// 该文件是 Shouyu （手语） 项目的一部分。
// src/output/gstreamer_display.rs - GStreamer 桌面窗口
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

//! # GStreamer 桌面窗口
//!
//! 通过 `appsrc ! videoconvert ! autovideosink` 把画面显示在桌面窗口中。
//!
//! ## URL Scheme
//!
//! `display://`，可选参数 `fps`（默认 30，只用于时间戳）。
//!
//! 管道在收到第一帧时按帧尺寸创建。窗口被关闭后，下一次 [`FrameView::show`]
//! 返回 [`GStreamerDisplayError::WindowClosed`]，调用方据此结束循环。

use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::FrameView};

#[derive(Error, Debug)]
pub enum GStreamerDisplayError {
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  #[error("GStreamer error: {0}")]
  GStreamerError(#[from] gst::glib::Error),
  #[error("GStreamer boolean error: {0}")]
  GStreamerBoolError(#[from] gst::glib::BoolError),
  #[error("State change error: {0}")]
  StateChangeError(#[from] gst::StateChangeError),
  #[error("Failed to get appsrc element")]
  AppSrcNotFound,
  #[error("Pipeline error: {0}")]
  PipelineError(String),
  #[error("Frame size changed from {expected:?} to {actual:?}")]
  FrameSizeChanged {
    expected: (u32, u32),
    actual: (u32, u32),
  },
  #[error("Display window closed")]
  WindowClosed,
}

struct DisplayPipeline {
  pipeline: gst::Pipeline,
  appsrc: gst_app::AppSrc,
  size: (u32, u32),
}

pub struct GStreamerDisplay {
  fps: u64,
  frame_count: u64,
  active: Option<DisplayPipeline>,
}

impl FromUrlWithScheme for GStreamerDisplay {
  const SCHEME: &'static str = "display";
}

impl FromUrl for GStreamerDisplay {
  type Error = GStreamerDisplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(GStreamerDisplayError::SchemeMismatch);
    }

    gst::init()?;

    let fps = url
      .query_pairs()
      .find(|(key, _)| key == "fps")
      .and_then(|(_, v)| v.parse::<u64>().ok())
      .filter(|fps| *fps > 0)
      .unwrap_or(30);

    Ok(GStreamerDisplay {
      fps,
      frame_count: 0,
      active: None,
    })
  }
}

impl GStreamerDisplay {
  fn open(&self, width: u32, height: u32) -> Result<DisplayPipeline, GStreamerDisplayError> {
    let description =
      "appsrc name=src is-live=true ! videoconvert ! autovideosink name=sink sync=false";
    info!("Creating display pipeline: {}", description);

    let pipeline = gst::parse::launch(description)?
      .downcast::<gst::Pipeline>()
      .map_err(|_| GStreamerDisplayError::PipelineError("Failed to create pipeline".to_string()))?;

    let appsrc = pipeline
      .by_name("src")
      .ok_or(GStreamerDisplayError::AppSrcNotFound)?
      .downcast::<gst_app::AppSrc>()
      .map_err(|_| GStreamerDisplayError::AppSrcNotFound)?;

    let caps = gst::Caps::builder("video/x-raw")
      .field("format", "RGB")
      .field("width", width as i32)
      .field("height", height as i32)
      .field("framerate", gst::Fraction::new(self.fps as i32, 1))
      .build();
    appsrc.set_caps(Some(&caps));
    appsrc.set_format(gst::Format::Time);

    pipeline.set_state(gst::State::Playing)?;
    info!("Display opened: {}x{}", width, height);

    Ok(DisplayPipeline {
      pipeline,
      appsrc,
      size: (width, height),
    })
  }

  // 窗口关闭时视频输出元素会在总线上报错
  fn poll_bus(active: &DisplayPipeline) -> Result<(), GStreamerDisplayError> {
    let Some(bus) = active.pipeline.bus() else {
      return Ok(());
    };
    while let Some(message) = bus.pop() {
      match message.view() {
        gst::MessageView::Eos(..) => return Err(GStreamerDisplayError::WindowClosed),
        gst::MessageView::Error(err) => {
          warn!("Display pipeline error: {}", err.error());
          return Err(GStreamerDisplayError::WindowClosed);
        }
        _ => {}
      }
    }
    Ok(())
  }
}

impl FrameView for GStreamerDisplay {
  type Error = GStreamerDisplayError;

  fn show(&mut self, image: &RgbImage) -> Result<(), Self::Error> {
    let size = image.dimensions();
    if self.active.is_none() {
      self.active = Some(self.open(size.0, size.1)?);
    }
    let Some(active) = self.active.as_ref() else {
      return Err(GStreamerDisplayError::AppSrcNotFound);
    };
    if active.size != size {
      return Err(GStreamerDisplayError::FrameSizeChanged {
        expected: active.size,
        actual: size,
      });
    }
    Self::poll_bus(active)?;

    let mut buffer = gst::Buffer::from_slice(image.as_raw().clone());
    let timestamp = self.frame_count * 1_000_000_000 / self.fps;
    if let Some(buffer_ref) = buffer.get_mut() {
      buffer_ref.set_pts(gst::ClockTime::from_nseconds(timestamp));
      buffer_ref.set_duration(gst::ClockTime::from_nseconds(1_000_000_000 / self.fps));
    }
    self.frame_count += 1;

    active
      .appsrc
      .push_buffer(buffer)
      .map_err(|_| GStreamerDisplayError::WindowClosed)?;
    debug!("Display frame {}", self.frame_count);
    Ok(())
  }
}

impl Drop for GStreamerDisplay {
  fn drop(&mut self) {
    if let Some(active) = self.active.take() {
      let _ = active.appsrc.end_of_stream();
      if let Err(e) = active.pipeline.set_state(gst::State::Null) {
        warn!("Failed to stop display pipeline: {}", e);
      }
    }
    info!("Display closed after {} frames", self.frame_count);
  }
}
