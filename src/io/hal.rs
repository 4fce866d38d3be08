// ============================================================================
// src/io/hal.rs - Platform Abstraction for the ENA Engine
// ============================================================================
//!
//! # ハードウェア抽象層
//!
//! プロトコルエンジンが必要とする外部コラボレータ。
//!
//! - `RegisterBar`: レジスタBARへのポステッド32bit書き込み
//! - `DmaAllocator`: コヒーレントDMAメモリ（`io::dma`）
//! - `Clock`: 単調時刻・マイクロ秒遅延・ミリ秒スリープ
//!
//! レジスタ読み出しはBARから直接行わず、readless MMIO（`ena::mmio`）で行う。

use super::dma::DmaAllocator;

// ============================================================================
// Register BAR
// ============================================================================

/// レジスタBARへの書き込み
pub trait RegisterBar: Send + Sync {
    /// `offset` のレジスタへ `value` を書き込む
    fn write32(&self, offset: u32, value: u32);
}

// ============================================================================
// Clock
// ============================================================================

/// 時刻と遅延
pub trait Clock: Send + Sync {
    /// 単調増加するマイクロ秒カウンタ
    fn now_us(&self) -> u64;

    /// ビジーウェイト
    fn udelay(&self, us: u32);

    /// スリープ（スケジューラに制御を譲ってよい）
    fn msleep(&self, ms: u32);

    /// イベント待ちループ1回分の休止
    fn relax(&self) {
        core::hint::spin_loop();
    }
}

// ============================================================================
// Combined HAL
// ============================================================================

/// ENAエンジンが要求するプラットフォーム機能一式
pub trait EnaHal: RegisterBar + DmaAllocator + Clock {}

impl<T: RegisterBar + DmaAllocator + Clock> EnaHal for T {}
