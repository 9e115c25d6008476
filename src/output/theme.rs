// 该文件是 Shouyu （手语） 项目的一部分。
// src/output/theme.rs - 主题配色
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

use std::{
  str::FromStr,
  sync::{Arc, Mutex, PoisonError},
};

use image::Rgb;
use thiserror::Error;

use crate::model::Finger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
  #[default]
  Dark,
  Light,
}

#[derive(Error, Debug)]
#[error("未知主题 '{0}'，可选 dark 或 light")]
pub struct ParseThemeError(String);

impl FromStr for Theme {
  type Err = ParseThemeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "dark" => Ok(Theme::Dark),
      "light" => Ok(Theme::Light),
      _ => Err(ParseThemeError(s.to_string())),
    }
  }
}

impl Theme {
  pub fn toggled(self) -> Theme {
    match self {
      Theme::Dark => Theme::Light,
      Theme::Light => Theme::Dark,
    }
  }

  pub fn palette(self) -> Palette {
    let accent = match self {
      Theme::Dark => Rgb([255, 180, 200]),
      Theme::Light => Rgb([180, 80, 130]),
    };
    Palette {
      wrist: accent,
      fingers: FINGER_COLORS,
      frame: accent,
      text: accent,
    }
  }
}

/// 可在其他线程切换的主题，克隆后共享同一个值
#[derive(Debug, Clone, Default)]
pub struct ThemeSwitch {
  current: Arc<Mutex<Theme>>,
}

impl ThemeSwitch {
  pub fn new(theme: Theme) -> Self {
    Self {
      current: Arc::new(Mutex::new(theme)),
    }
  }

  pub fn get(&self) -> Theme {
    *self.current.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn set(&self, theme: Theme) {
    *self.current.lock().unwrap_or_else(PoisonError::into_inner) = theme;
  }

  /// 切换到另一种主题并返回新主题
  pub fn toggle(&self) -> Theme {
    let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
    *current = current.toggled();
    *current
  }
}

// 拇指蓝、食指绿、中指红、无名指品红、小指黄，两种主题相同
const FINGER_COLORS: [Rgb<u8>; 5] = [
  Rgb([0, 0, 255]),
  Rgb([0, 255, 0]),
  Rgb([255, 0, 0]),
  Rgb([255, 0, 255]),
  Rgb([255, 255, 0]),
];

/// 叠加层配色，只影响显示，不影响识别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
  pub wrist: Rgb<u8>,
  pub fingers: [Rgb<u8>; 5],
  /// 边框与角标
  pub frame: Rgb<u8>,
  pub text: Rgb<u8>,
}

impl Palette {
  pub fn finger(&self, finger: Finger) -> Rgb<u8> {
    self.fingers[finger as usize]
  }

  /// 按关键点序号取颜色，手腕使用主题色
  pub fn point(&self, index: usize) -> Rgb<u8> {
    Finger::of(index).map_or(self.wrist, |finger| self.finger(finger))
  }
}
