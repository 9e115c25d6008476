// 该文件是 Shouyu （手语） 项目的一部分。
// src/bin/desktop.rs - 桌面识别程序
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
  io::{self, BufRead, Write},
  thread,
  time::Duration,
};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use url::Url;

use shouyu::{
  FromUrl,
  input::InputWrapper,
  model::{KnnClassifierBuilder, SubprocessLandmarker},
  output::{DesktopOutput, LabelIndicator, OutputWrapper, Theme, ThemeSwitch, status_line},
  pipeline::RecognitionPipeline,
  task::{ContinuousTask, Task},
};

/// 手语字母识别（桌面窗口）
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 分类模型，例如 knn:///path/model.json?k=3
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 v4l:///dev/video0 或 gst://camera/dev/video0
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 画面输出，display:// 为桌面窗口，image:///path.png 为图片文件
  #[arg(long, value_name = "OUTPUT", default_value = "display://")]
  pub output: Url,
  /// 关键点检测程序的命令行
  #[arg(long, value_name = "COMMAND")]
  pub landmarker: String,
  /// 配色主题: dark 或 light
  #[arg(long, default_value = "dark")]
  pub theme: Theme,
  #[arg(long, default_value_t = 1)]
  pub max_hands: usize,
  /// 最大处理帧数，0 表示无限制
  #[arg(long, value_name = "FRAME_NUMBER", default_value_t = 0)]
  pub frame_number: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let classifier = KnnClassifierBuilder::from_url(&args.model)?.build()?;
  let detector = SubprocessLandmarker::from_command_line(&args.landmarker)?;
  let mut pipeline = RecognitionPipeline::builder(detector, classifier)
    .max_hands(args.max_hands)
    .theme(args.theme)
    .build();
  let output = DesktopOutput::new(OutputWrapper::from_url(&args.output)?);

  let theme = pipeline.theme_switch();
  spawn_theme_toggle(theme.clone());
  spawn_status_line(output.indicator().clone(), theme);

  let frame_number = (args.frame_number > 0).then_some(args.frame_number);
  let frames = ContinuousTask::default()
    .with_frame_number(frame_number)
    .with_ctrlc()?
    .run_task(input, &mut pipeline, output)?;
  info!("共处理 {} 帧", frames);

  Ok(())
}

// 标准输入每收到一行 t 切换一次主题
fn spawn_theme_toggle(theme: ThemeSwitch) {
  thread::spawn(move || {
    for line in io::stdin().lock().lines() {
      match line {
        Ok(line) if line.trim().eq_ignore_ascii_case("t") => {
          info!("切换主题: {:?}", theme.toggle());
        }
        Ok(_) => {}
        Err(e) => {
          warn!("读取标准输入失败: {}", e);
          break;
        }
      }
    }
  });
}

// 状态行写到标准错误，只在内容变化时刷新
fn spawn_status_line(indicator: LabelIndicator, theme: ThemeSwitch) {
  thread::spawn(move || {
    let mut shown = String::new();
    loop {
      let line = status_line(&indicator, theme.get());
      if line != shown {
        let mut stderr = io::stderr().lock();
        if write!(stderr, "\r{}", line).and_then(|_| stderr.flush()).is_err() {
          break;
        }
        shown = line;
      }
      thread::sleep(Duration::from_millis(100));
    }
  });
}
