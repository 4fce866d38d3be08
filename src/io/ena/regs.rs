// ============================================================================
// src/io/ena/regs.rs - ENA Register Definitions
// ============================================================================
//!
//! ENAレジスタBARのオフセットとビットフィールド定義。

use bitflags::bitflags;

// ============================================================================
// Register Offsets
// ============================================================================

/// レジスタオフセット
pub mod offsets {
    /// Version - RO
    pub const VERSION: u32 = 0x00;
    /// Controller Version - RO
    pub const CONTROLLER_VERSION: u32 = 0x04;
    /// Capabilities - RO
    pub const CAPS: u32 = 0x08;
    /// Extended Capabilities - RO
    pub const CAPS_EXT: u32 = 0x0C;
    /// Admin Queue Base Low - RW
    pub const AQ_BASE_LO: u32 = 0x10;
    /// Admin Queue Base High - RW
    pub const AQ_BASE_HI: u32 = 0x14;
    /// Admin Queue Capabilities - RW
    pub const AQ_CAPS: u32 = 0x18;
    /// Admin Completion Queue Base Low - RW
    pub const ACQ_BASE_LO: u32 = 0x20;
    /// Admin Completion Queue Base High - RW
    pub const ACQ_BASE_HI: u32 = 0x24;
    /// Admin Completion Queue Capabilities - RW
    pub const ACQ_CAPS: u32 = 0x28;
    /// Admin Queue Doorbell - WO
    pub const AQ_DB: u32 = 0x2C;
    /// Admin Completion Queue Tail - RO
    pub const ACQ_TAIL: u32 = 0x30;
    /// Async Event Notification Queue Capabilities - RW
    pub const AENQ_CAPS: u32 = 0x34;
    /// AENQ Base Low - RW
    pub const AENQ_BASE_LO: u32 = 0x38;
    /// AENQ Base High - RW
    pub const AENQ_BASE_HI: u32 = 0x3C;
    /// AENQ Head Doorbell - WO
    pub const AENQ_HEAD_DB: u32 = 0x40;
    /// AENQ Tail - RO
    pub const AENQ_TAIL: u32 = 0x44;
    /// Interrupt Mask - RW
    pub const INTR_MASK: u32 = 0x4C;
    /// Device Control - RW
    pub const DEV_CTL: u32 = 0x54;
    /// Device Status - RO
    pub const DEV_STS: u32 = 0x58;
    /// MMIO Register Read request - WO
    pub const MMIO_REG_READ: u32 = 0x5C;
    /// MMIO Response Address Low - RW
    pub const MMIO_RESP_LO: u32 = 0x60;
    /// MMIO Response Address High - RW
    pub const MMIO_RESP_HI: u32 = 0x64;
    /// RSS Indirection Entry Update - RW
    pub const RSS_IND_ENTRY_UPDATE: u32 = 0x68;

    /// レジスタ空間のサイズ
    pub const REGS_WINDOW_SIZE: u32 = 0x6C;
}

// ============================================================================
// Device Status / Control
// ============================================================================

bitflags! {
    /// DEV_STS ビット
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DevStatus: u32 {
        const READY = 1 << 0;
        const AQ_RESTART_IN_PROGRESS = 1 << 1;
        const AQ_RESTART_FINISHED = 1 << 2;
        const RESET_IN_PROGRESS = 1 << 3;
        const RESET_FINISHED = 1 << 4;
        const FATAL_ERROR = 1 << 5;
        const QUIESCENT_STATE_IN_PROGRESS = 1 << 6;
        const QUIESCENT_STATE_ACHIEVED = 1 << 7;
    }
}

bitflags! {
    /// DEV_CTL ビット
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DevControl: u32 {
        const DEV_RESET = 1 << 0;
        const AQ_RESTART = 1 << 1;
        const QUIESCENT = 1 << 2;
        const IO_RESUME = 1 << 3;
    }
}

bitflags! {
    /// 管理割り込みの要因ビット
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AdminInterrupt: u32 {
        const ACQ = 1 << 0;
        const AENQ = 1 << 1;
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// CAPS レジスタ
#[derive(Debug, Clone, Copy)]
pub struct EnaCapabilities {
    raw: u32,
}

impl EnaCapabilities {
    const CONTIGUOUS_QUEUE_REQUIRED: u32 = 0x1;
    const RESET_TIMEOUT_MASK: u32 = 0x3E;
    const RESET_TIMEOUT_SHIFT: u32 = 1;
    const DMA_ADDR_WIDTH_MASK: u32 = 0xFF00;
    const DMA_ADDR_WIDTH_SHIFT: u32 = 8;

    pub fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// 連続キューメモリが必須か
    pub fn contiguous_queue_required(&self) -> bool {
        self.raw & Self::CONTIGUOUS_QUEUE_REQUIRED != 0
    }

    /// リセットタイムアウト（100ms単位）
    pub fn reset_timeout(&self) -> u32 {
        (self.raw & Self::RESET_TIMEOUT_MASK) >> Self::RESET_TIMEOUT_SHIFT
    }

    /// DMAアドレス幅（ビット）
    pub fn dma_addr_width(&self) -> u32 {
        (self.raw & Self::DMA_ADDR_WIDTH_MASK) >> Self::DMA_ADDR_WIDTH_SHIFT
    }
}

// ============================================================================
// Versions
// ============================================================================

/// VERSION レジスタ
#[derive(Debug, Clone, Copy)]
pub struct EnaVersion {
    raw: u32,
}

impl EnaVersion {
    pub fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    pub fn major(&self) -> u32 {
        (self.raw & 0xFF00) >> 8
    }

    pub fn minor(&self) -> u32 {
        self.raw & 0xFF
    }

    /// 比較用の値 (major << 8 | minor)
    pub fn value(&self) -> u32 {
        self.raw & 0xFFFF
    }
}

/// CONTROLLER_VERSION レジスタ
#[derive(Debug, Clone, Copy)]
pub struct EnaControllerVersion {
    raw: u32,
}

impl EnaControllerVersion {
    pub fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    pub fn major(&self) -> u32 {
        (self.raw & 0x00FF_0000) >> 16
    }

    pub fn minor(&self) -> u32 {
        (self.raw & 0x0000_FF00) >> 8
    }

    pub fn subminor(&self) -> u32 {
        self.raw & 0x0000_00FF
    }

    /// 実装ID（比較には使わない）
    pub fn impl_id(&self) -> u32 {
        (self.raw & 0xFF00_0000) >> 24
    }

    /// 比較用の値 (major.minor.subminor)
    pub fn value(&self) -> u32 {
        self.raw & 0x00FF_FFFF
    }
}

// ============================================================================
// Queue capability words
// ============================================================================

/// AQ/ACQ/AENQ の caps ワード: 深度 (15:0) | エントリサイズ (31:16)
pub fn queue_caps(depth: u16, entry_size: usize) -> u32 {
    (depth as u32 & 0xFFFF) | (((entry_size as u32) << 16) & 0xFFFF_0000)
}

/// MMIO_REG_READ の要求ワード: オフセット (31:16) | 要求ID (15:0)
pub fn mmio_read_request(offset: u16, req_id: u16) -> u32 {
    (((offset as u32) << 16) & 0xFFFF_0000) | (req_id as u32 & 0xFFFF)
}
