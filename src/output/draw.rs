// 该文件是 Shouyu （手语） 项目的一部分。
// src/output/draw.rs - 识别结果可视化
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_text_mut, text_size,
  },
  rect::Rect,
};
use thiserror::Error;
use tracing::info;

use crate::{
  model::{HAND_LANDMARK_COUNT, HandLandmarks},
  output::Palette,
};

// 边框相对关键点外扩的像素数
const BOX_MARGIN: i32 = 10;
// 角标长度
const CORNER_LENGTH: i32 = 20;
const CORNER_THICKNESS: i32 = 3;
const POINT_RADIUS: i32 = 5;
// 文字底部与边框顶部的距离
const LABEL_OFFSET: i32 = 10;
const LABEL_FONT_SIZE: f32 = 32.0;

static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans-Bold.ttf");

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("字体文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无效的字体文件: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 绘制所有手的骨架
///
/// 每个关键点画一个实心圆，序号大于 0 的点再向前一个点连线。
/// 连线只按序号相邻，不区分手指边界，因此 5→4 这样的跨指连线也会画出。
pub fn draw_skeleton(image: &mut RgbImage, hands: &[HandLandmarks], palette: &Palette) {
  let (w, h) = image.dimensions();
  for hand in hands {
    let points = hand.points();
    draw_filled_circle_mut(image, points[0].to_pixel(w, h), POINT_RADIUS, palette.wrist);
    for index in 1..HAND_LANDMARK_COUNT {
      let color = palette.point(index);
      let current = points[index].to_pixel(w, h);
      let previous = points[index - 1].to_pixel(w, h);
      draw_filled_circle_mut(image, current, POINT_RADIUS, color);
      draw_thick_line(image, current, previous, color);
    }
  }
}

// 两条相邻的 1 像素线段组成 2 像素粗线
fn draw_thick_line(image: &mut RgbImage, from: (i32, i32), to: (i32, i32), color: Rgb<u8>) {
  let start = (from.0 as f32, from.1 as f32);
  let end = (to.0 as f32, to.1 as f32);
  draw_line_segment_mut(image, start, end, color);

  let (dx, dy) = (end.0 - start.0, end.1 - start.1);
  let (ox, oy) = if dx.abs() >= dy.abs() {
    (0.0, 1.0)
  } else {
    (1.0, 0.0)
  };
  draw_line_segment_mut(
    image,
    (start.0 + ox, start.1 + oy),
    (end.0 + ox, end.1 + oy),
    color,
  );
}

/// 像素坐标下的边框，两个角都包含在内
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
  pub x1: i32,
  pub y1: i32,
  pub x2: i32,
  pub y2: i32,
}

impl BoundingBox {
  /// 所有关键点的外接框，四周外扩 10 像素并裁剪到画面内
  pub fn around(hands: &[HandLandmarks], width: u32, height: u32) -> Option<BoundingBox> {
    if width == 0 || height == 0 {
      return None;
    }

    let mut pixels = hands
      .iter()
      .flat_map(|hand| hand.points().iter())
      .map(|p| p.to_pixel(width, height));
    let first = pixels.next()?;
    let (mut x1, mut y1, mut x2, mut y2) = (first.0, first.1, first.0, first.1);
    for (x, y) in pixels {
      x1 = x1.min(x);
      y1 = y1.min(y);
      x2 = x2.max(x);
      y2 = y2.max(y);
    }

    Some(
      BoundingBox {
        x1: x1.saturating_sub(BOX_MARGIN),
        y1: y1.saturating_sub(BOX_MARGIN),
        x2: x2.saturating_add(BOX_MARGIN),
        y2: y2.saturating_add(BOX_MARGIN),
      }
      .clamp(width, height),
    )
  }

  pub fn clamp(self, width: u32, height: u32) -> BoundingBox {
    let max_x = width.saturating_sub(1) as i32;
    let max_y = height.saturating_sub(1) as i32;
    BoundingBox {
      x1: self.x1.clamp(0, max_x),
      y1: self.y1.clamp(0, max_y),
      x2: self.x2.clamp(0, max_x),
      y2: self.y2.clamp(0, max_y),
    }
  }

  pub fn width(&self) -> u32 {
    (self.x2 - self.x1 + 1).max(0) as u32
  }

  pub fn height(&self) -> u32 {
    (self.y2 - self.y1 + 1).max(0) as u32
  }

  pub fn is_degenerate(&self) -> bool {
    self.x1 >= self.x2 || self.y1 >= self.y2
  }
}

/// 绘制 2 像素边框，并在左上角、右下角各画两道 20 像素长的角标
pub fn draw_box(image: &mut RgbImage, bbox: BoundingBox, palette: &Palette) {
  if bbox.is_degenerate() {
    return;
  }

  let color = palette.frame;
  let (w, h) = (bbox.width(), bbox.height());
  draw_hollow_rect_mut(image, Rect::at(bbox.x1, bbox.y1).of_size(w, h), color);
  if w > 2 && h > 2 {
    draw_hollow_rect_mut(
      image,
      Rect::at(bbox.x1 + 1, bbox.y1 + 1).of_size(w - 2, h - 2),
      color,
    );
  }

  // 角标以边框线为中心线，宽 3 像素
  let half = CORNER_THICKNESS / 2;
  let length = (CORNER_LENGTH + 1) as u32;
  let thickness = CORNER_THICKNESS as u32;
  let strokes = [
    // 左上角：向右、向下
    Rect::at(bbox.x1, bbox.y1 - half).of_size(length, thickness),
    Rect::at(bbox.x1 - half, bbox.y1).of_size(thickness, length),
    // 右下角：向左、向上
    Rect::at(bbox.x2 - CORNER_LENGTH, bbox.y2 - half).of_size(length, thickness),
    Rect::at(bbox.x2 - half, bbox.y2 - CORNER_LENGTH).of_size(thickness, length),
  ];
  for stroke in strokes {
    draw_filled_rect_mut(image, stroke, color);
  }
}

/// 文字左上角位置：边框左上角上方 10 像素，不超出画面顶部
pub fn label_origin(bbox: BoundingBox, text_height: u32) -> (i32, i32) {
  let y = bbox.y1 - LABEL_OFFSET - text_height as i32;
  (bbox.x1, y.max(0))
}

/// 标签文字绘制，默认使用内嵌字体，也可在运行时加载其他字体
#[derive(Clone)]
pub struct LabelDraw {
  font: FontArc,
  scale: PxScale,
}

impl LabelDraw {
  pub fn new(font: FontArc) -> Self {
    Self {
      font,
      scale: PxScale::from(LABEL_FONT_SIZE),
    }
  }

  /// 内嵌的 DejaVu Sans Bold
  pub fn embedded() -> Result<Self, DrawError> {
    let font = FontArc::try_from_slice(EMBEDDED_FONT)?;
    Ok(Self::new(font))
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DrawError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data)?;
    info!("加载字体: {}", path.display());
    Ok(Self::new(font))
  }

  pub fn with_font_size(mut self, size: f32) -> Self {
    self.scale = PxScale::from(size);
    self
  }

  pub fn text_size(&self, text: &str) -> (u32, u32) {
    text_size(self.scale, &self.font, text)
  }

  pub fn draw_label(&self, image: &mut RgbImage, bbox: BoundingBox, text: &str, palette: &Palette) {
    let (_, text_height) = self.text_size(text);
    let (x, y) = label_origin(bbox, text_height);
    draw_text_mut(image, palette.text, x, y, self.scale, &self.font, text);
  }
}
