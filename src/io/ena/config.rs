// ============================================================================
// src/io/ena/config.rs - Admin Engine Configuration
// ============================================================================
//!
//! 管理キュー・AENQ・レジスタ読み出し・リセットの時間とサイズの設定。

use super::defs::{ADMIN_QUEUE_DEPTH, ASYNC_QUEUE_DEPTH, MAX_ADMIN_QUEUE_DEPTH};
use super::error::{EnaError, Result};

/// 完了待ちの方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// 割り込みハンドラが ACQ を回収し、待機側はイベントで起床
    Interrupt,
    /// 待機側が自分で ACQ を回収する
    Polling,
}

/// 管理エンジン設定
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// AQ/ACQ の深度（2の冪）
    pub admin_queue_depth: u16,
    /// AENQ の深度（2の冪）
    pub aenq_depth: u16,
    /// コマンド完了のタイムアウト（マイクロ秒）
    pub cmd_timeout_us: u64,
    /// ポーリング待ちの間隔（ミリ秒）
    pub poll_interval_ms: u32,
    /// 中断後の未完了数確認の間隔（ミリ秒）
    pub abort_poll_interval_ms: u32,
    /// readless 読み出しの最大試行回数
    pub reg_read_timeout_iters: u32,
    /// readless 読み出しの試行間隔（マイクロ秒）
    pub reg_read_delay_us: u32,
    /// リセット状態確認の間隔（ミリ秒、CAPSのタイムアウト単位）
    pub reset_poll_interval_ms: u32,
    /// 完了待ちの方式
    pub completion_mode: CompletionMode,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            admin_queue_depth: ADMIN_QUEUE_DEPTH, // 32
            aenq_depth: ASYNC_QUEUE_DEPTH,        // 4
            cmd_timeout_us: 10_000_000,           // 10s
            poll_interval_ms: 100,
            abort_poll_interval_ms: 20,
            reg_read_timeout_iters: 200_000,
            reg_read_delay_us: 1,
            reset_poll_interval_ms: 100,
            completion_mode: CompletionMode::Interrupt,
        }
    }
}

impl AdminConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_admin_queue_depth(&mut self, depth: u16) -> &mut Self {
        self.admin_queue_depth = depth;
        self
    }

    pub fn set_aenq_depth(&mut self, depth: u16) -> &mut Self {
        self.aenq_depth = depth;
        self
    }

    pub fn set_cmd_timeout_us(&mut self, us: u64) -> &mut Self {
        self.cmd_timeout_us = us;
        self
    }

    pub fn set_poll_interval_ms(&mut self, ms: u32) -> &mut Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn set_abort_poll_interval_ms(&mut self, ms: u32) -> &mut Self {
        self.abort_poll_interval_ms = ms;
        self
    }

    pub fn set_reg_read_timeout(&mut self, iters: u32, delay_us: u32) -> &mut Self {
        self.reg_read_timeout_iters = iters;
        self.reg_read_delay_us = delay_us;
        self
    }

    pub fn set_reset_poll_interval_ms(&mut self, ms: u32) -> &mut Self {
        self.reset_poll_interval_ms = ms;
        self
    }

    pub fn set_completion_mode(&mut self, mode: CompletionMode) -> &mut Self {
        self.completion_mode = mode;
        self
    }

    /// 深度と回数の妥当性を検査
    pub fn validate(&self) -> Result<()> {
        let depth_ok =
            |d: u16| d >= 2 && d.is_power_of_two() && d <= MAX_ADMIN_QUEUE_DEPTH;
        if !depth_ok(self.admin_queue_depth) || !depth_ok(self.aenq_depth) {
            return Err(EnaError::InvalidArgument);
        }
        if self.reg_read_timeout_iters == 0 {
            return Err(EnaError::InvalidArgument);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AdminConfig::default();
        assert_eq!(cfg.admin_queue_depth, 32);
        assert_eq!(cfg.aenq_depth, 4);
        assert_eq!(cfg.cmd_timeout_us, 10_000_000);
        assert_eq!(cfg.reg_read_timeout_iters, 200_000);
        assert_eq!(cfg.completion_mode, CompletionMode::Interrupt);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_depths() {
        let mut cfg = AdminConfig::new();
        cfg.set_admin_queue_depth(24);
        assert_eq!(cfg.validate(), Err(EnaError::InvalidArgument));
        cfg.set_admin_queue_depth(16).set_aenq_depth(1);
        assert_eq!(cfg.validate(), Err(EnaError::InvalidArgument));
        cfg.set_aenq_depth(8);
        assert!(cfg.validate().is_ok());
    }
}
