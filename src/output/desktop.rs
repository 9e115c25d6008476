// 该文件是 Shouyu （手语） 项目的一部分。
// src/output/desktop.rs - 桌面输出
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

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::{
  model::SignLabel,
  output::{FrameView, Render, Theme},
  pipeline::Recognition,
};

/// 当前识别结果，与画面分开显示
///
/// 克隆后共享同一个值，界面线程可以随时读取。
#[derive(Debug, Clone, Default)]
pub struct LabelIndicator {
  current: Arc<Mutex<SignLabel>>,
}

impl LabelIndicator {
  pub fn new() -> Self {
    Self::default()
  }

  /// 更新标签，值发生变化时返回 `true`
  pub fn set(&self, label: SignLabel) -> bool {
    let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
    if *current == label {
      return false;
    }
    *current = label;
    info!("识别结果: {}", label.glyph());
    true
  }

  pub fn get(&self) -> SignLabel {
    *self.current.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// 界面显示的文字，未识别时为 `?`
  pub fn text(&self) -> &'static str {
    self.get().glyph()
  }
}

/// 终端状态行：当前标签与主题
pub fn status_line(indicator: &LabelIndicator, theme: Theme) -> String {
  let theme = match theme {
    Theme::Dark => "dark",
    Theme::Light => "light",
  };
  format!("识别结果: {:<5} | 主题: {:<5} | 输入 t 回车切换主题", indicator.text(), theme)
}

/// 桌面输出：画面原样交给视图，标签走指示器，不烧进画面
pub struct DesktopOutput<V> {
  view: V,
  indicator: LabelIndicator,
}

impl<V: FrameView> DesktopOutput<V> {
  pub fn new(view: V) -> Self {
    Self {
      view,
      indicator: LabelIndicator::new(),
    }
  }

  pub fn with_indicator(mut self, indicator: LabelIndicator) -> Self {
    self.indicator = indicator;
    self
  }

  pub fn indicator(&self) -> &LabelIndicator {
    &self.indicator
  }

  pub fn view(&self) -> &V {
    &self.view
  }
}

impl<V: FrameView> Render for DesktopOutput<V> {
  type Error = V::Error;

  fn render_result(&mut self, result: Recognition) -> Result<(), Self::Error> {
    self.indicator.set(result.label);
    self.view.show(&result.image)
  }
}
