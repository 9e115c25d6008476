// 该文件是 Shouyu （手语） 项目的一部分。
// src/task.rs - 任务循环
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
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread,
  time::{Duration, Instant},
};

use tracing::{info, warn};

use crate::{
  input::FrameSource,
  model::{Classifier, LandmarkDetector, SignLabel},
  output::Render,
  pipeline::RecognitionPipeline,
};

const TICK: Duration = Duration::from_millis(20);

pub trait Task<I, D, C, O>: Sized {
  type Error;
  type Output;
  fn run_task(
    self,
    input: I,
    pipeline: &mut RecognitionPipeline<D, C>,
    output: O,
  ) -> Result<Self::Output, Self::Error>;
}

/// 处理一帧，返回识别结果标签
#[derive(Default, Debug)]
pub struct OneShotTask;

impl<I, D, C, O, RE> Task<I, D, C, O> for OneShotTask
where
  I: FrameSource,
  D: LandmarkDetector,
  C: Classifier,
  O: Render<Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;
  type Output = SignLabel;

  fn run_task(
    self,
    mut input: I,
    pipeline: &mut RecognitionPipeline<D, C>,
    mut output: O,
  ) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let frame = input.next_frame().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始识别...");
    let now = Instant::now();
    let result = pipeline.process(&frame);
    let label = result.label;
    info!("识别完成，耗时: {:.2?}", now.elapsed());
    output.render_result(result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(label)
  }
}

/// 连续处理帧，直到输入源结束、达到帧数、收到中断或输出失败
#[derive(Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  interrupt: Option<Arc<AtomicBool>>,
  tick: Duration,
}

impl Default for ContinuousTask {
  fn default() -> Self {
    Self {
      frame_number: None,
      interrupt: None,
      tick: TICK,
    }
  }
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 标志被置位后在下一帧前退出
  pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
    self.interrupt = Some(interrupt);
    self
  }

  pub fn with_tick(mut self, tick: Duration) -> Self {
    self.tick = tick;
    self
  }

  /// 安装 Ctrl-C 处理器，收到信号时置位中断标志
  pub fn with_ctrlc(self) -> anyhow::Result<Self> {
    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = interrupt.clone();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      flag.store(true, Ordering::SeqCst);
    })?;
    Ok(self.with_interrupt(interrupt))
  }

  fn interrupted(&self) -> bool {
    self
      .interrupt
      .as_ref()
      .is_some_and(|flag| flag.load(Ordering::SeqCst))
  }
}

impl<I, D, C, O, RE> Task<I, D, C, O> for ContinuousTask
where
  I: FrameSource,
  D: LandmarkDetector,
  C: Classifier,
  O: Render<Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;
  /// 处理的帧数
  type Output = usize;

  fn run_task(
    self,
    mut input: I,
    pipeline: &mut RecognitionPipeline<D, C>,
    mut output: O,
  ) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let mut frame_index = 0;
    let mut now = Instant::now();

    loop {
      if self.interrupted() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
      if input.is_finished() {
        info!("输入源结束，退出任务循环");
        break;
      }

      let Some(frame) = input.next_frame() else {
        thread::sleep(self.tick);
        continue;
      };

      frame_index += 1;
      let result = pipeline.process(&frame);
      let elapsed_a = now.elapsed();
      if let Err(e) = output.render_result(result) {
        warn!("输出失败，退出任务循环: {}", e);
        break;
      }
      let elapsed_b = now.elapsed();
      now = Instant::now();
      info!(
        "第 {} 帧处理完成，耗时: {:.2?} / {:.2?}",
        frame_index, elapsed_a, elapsed_b
      );

      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
    }

    info!("任务完成，退出");
    Ok(frame_index)
  }
}
