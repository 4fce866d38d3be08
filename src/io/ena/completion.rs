// ============================================================================
// src/io/ena/completion.rs - Completion Contexts and Wait Strategies
// ============================================================================
//!
//! # 完了コンテキストと待機戦略
//!
//! コマンドIDごとに1つのコンテキストを持ち、ACQ から回収した応答を保持する。
//! 待機は2通り:
//! - `PollingWaiter`: 待機側が自分で ACQ を回収する
//! - `EventWaiter`: 割り込みハンドラの回収を待ち、期限切れ時に一度だけ自分で回収する

use core::sync::atomic::{AtomicBool, Ordering};
use log::{error, warn};

use super::commands::AcqEntry;

// ============================================================================
// Command status
// ============================================================================

/// コマンドの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdStatus {
    /// コンテキスト未使用
    Idle,
    Submitted,
    Completed,
    Aborted,
    /// 完了が来ないまま期限切れ
    Failed,
}

/// 待機の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    Aborted,
    TimedOut,
}

// ============================================================================
// Completion context
// ============================================================================

/// 送信中コマンド1件分の状態（管理キューのロック下で操作）
#[derive(Debug, Clone, Copy)]
pub struct CompletionContext {
    pub occupied: bool,
    pub status: CmdStatus,
    /// デバイスが返した status バイト
    pub comp_status: u8,
    pub cmd_opcode: u8,
    /// 呼び出し側が受け取る応答のバイト数
    pub comp_size: usize,
    pub response: AcqEntry,
}

impl CompletionContext {
    pub const fn new() -> Self {
        Self {
            occupied: false,
            status: CmdStatus::Idle,
            comp_status: 0,
            cmd_opcode: 0,
            comp_size: 0,
            response: AcqEntry {
                common: super::commands::AcqCommonDesc {
                    command: 0,
                    status: 0,
                    flags: 0,
                    extended_status: 0,
                    sq_head_indx: 0,
                },
                payload: [0; 14],
            },
        }
    }

    /// 送信時に確保
    pub fn capture(&mut self, opcode: u8, comp_size: usize) {
        self.occupied = true;
        self.status = CmdStatus::Submitted;
        self.comp_status = 0;
        self.cmd_opcode = opcode;
        self.comp_size = comp_size;
        self.response = AcqEntry::default();
    }

    /// 呼び出し側へ結果を返した後に解放
    pub fn release(&mut self) {
        self.occupied = false;
        self.status = CmdStatus::Idle;
    }

    /// ACQ エントリを記録
    pub fn complete(&mut self, entry: &AcqEntry) {
        self.status = CmdStatus::Completed;
        self.comp_status = entry.status();
        entry.copy_prefix_to(&mut self.response, self.comp_size);
    }
}

impl Default for CompletionContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Wait event
// ============================================================================

/// コマンド1件分の完了通知
///
/// 回収側が `signal`、待機側が `is_signaled` を見る。
/// ロックの外から参照されるのでアトミックで持つ。
#[derive(Debug, Default)]
pub struct WaitEvent {
    signaled: AtomicBool,
}

impl WaitEvent {
    pub const fn new() -> Self {
        Self {
            signaled: AtomicBool::new(false),
        }
    }

    pub fn reset(&self) {
        self.signaled.store(false, Ordering::Release);
    }

    pub fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }
}

// ============================================================================
// Wait strategies
// ============================================================================

/// 待機戦略から見た管理キュー
pub trait CompletionSource {
    fn now_us(&self) -> u64;
    fn msleep(&self, ms: u32);
    fn relax(&self);
    /// 現在の状態（回収はしない）
    fn status(&self, cmd_id: u16) -> CmdStatus;
    /// ACQ を回収してから状態を返す
    fn poll_completions(&self, cmd_id: u16) -> CmdStatus;
    fn event(&self, cmd_id: u16) -> &WaitEvent;
}

/// 完了待ちの戦略
pub trait CompletionWaiter {
    /// `deadline_us` までに `cmd_id` が終わるのを待つ
    fn wait<S: CompletionSource>(&self, source: &S, cmd_id: u16, deadline_us: u64) -> WaitOutcome;
}

fn outcome_of(status: CmdStatus) -> Option<WaitOutcome> {
    match status {
        CmdStatus::Completed => Some(WaitOutcome::Completed),
        CmdStatus::Aborted => Some(WaitOutcome::Aborted),
        CmdStatus::Failed => Some(WaitOutcome::TimedOut),
        CmdStatus::Submitted | CmdStatus::Idle => None,
    }
}

/// ポーリング待ち
#[derive(Debug, Clone, Copy)]
pub struct PollingWaiter {
    pub interval_ms: u32,
}

impl CompletionWaiter for PollingWaiter {
    fn wait<S: CompletionSource>(&self, source: &S, cmd_id: u16, deadline_us: u64) -> WaitOutcome {
        loop {
            if let Some(outcome) = outcome_of(source.poll_completions(cmd_id)) {
                return outcome;
            }
            if source.now_us() > deadline_us {
                error!("ENA: wait for completion (polling) timeout, cmd_id={}", cmd_id);
                return WaitOutcome::TimedOut;
            }
            source.msleep(self.interval_ms);
        }
    }
}

/// イベント待ち
#[derive(Debug, Clone, Copy, Default)]
pub struct EventWaiter;

impl CompletionWaiter for EventWaiter {
    fn wait<S: CompletionSource>(&self, source: &S, cmd_id: u16, deadline_us: u64) -> WaitOutcome {
        let event = source.event(cmd_id);
        while !event.is_signaled() && source.now_us() < deadline_us {
            source.relax();
        }

        if let Some(outcome) = outcome_of(source.status(cmd_id)) {
            return outcome;
        }

        // 割り込みを取りこぼした可能性があるので一度だけ自分で回収する
        match outcome_of(source.poll_completions(cmd_id)) {
            Some(WaitOutcome::Completed) => {
                warn!(
                    "ENA: cmd_id={} completed without interrupt, check admin interrupt delivery",
                    cmd_id
                );
                WaitOutcome::Completed
            }
            Some(outcome) => outcome,
            None => {
                error!("ENA: wait for completion (interrupt) timeout, cmd_id={}", cmd_id);
                WaitOutcome::TimedOut
            }
        }
    }
}
