// ============================================================================
// src/io/ena/defs.rs - ENA Common Definitions
// ============================================================================
//!
//! # ENA共通定義
//!
//! オペコード、完了ステータス、AENQグループ、機能ID、キュー種別などの定数。

use super::error::{EnaError, Result};

// ============================================================================
// Constants
// ============================================================================

/// 管理キューのデフォルト深度
pub const ADMIN_QUEUE_DEPTH: u16 = 32;

/// AENQのデフォルト深度
pub const ASYNC_QUEUE_DEPTH: u16 = 4;

/// readless MMIO 読み出しの失敗値
pub const MMIO_READ_TIMEOUT: u32 = 0xFFFF_FFFF;

/// コマンドIDに使えるビット
pub const CMD_ID_MASK: u16 = 0x1FFF;

/// 管理キューの最大深度（コマンドIDのビット幅で制限）
pub const MAX_ADMIN_QUEUE_DEPTH: u16 = CMD_ID_MASK + 1;

/// AENQハンドラテーブルのサイズ
pub const MAX_AENQ_HANDLERS: usize = 256;

/// I/Oキュー数の上限（TX 128 + RX 128）
pub const MAX_NUM_IO_QUEUES: u16 = 128;
pub const TOTAL_NUM_QUEUES: u16 = 2 * MAX_NUM_IO_QUEUES;

/// 最小デバイスバージョン 0.9
pub const MIN_ENA_VER: u32 = (0 << 8) | 9;

/// 最小コントローラバージョン 0.0.1
pub const MIN_ENA_CTRL_VER: u32 = (0 << 16) | (0 << 8) | 1;

/// DMAアドレスの最大幅
pub const MAX_DMA_ADDR_BITS: u32 = 48;

/// 拡張統計のコントロールバッファ長
pub const EXTENDED_STATS_LEN: usize = 4096;

/// I/Oディスクリプタサイズ（バイト）
pub const TX_DESC_SIZE: usize = 16;
pub const RX_DESC_SIZE: usize = 16;
pub const TX_CDESC_SIZE: usize = 8;
pub const RX_CDESC_SIZE: usize = 16;

// ============================================================================
// Admin Opcodes
// ============================================================================

/// 管理コマンドのオペコード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdminOpcode {
    CreateSq = 1,
    DestroySq = 2,
    CreateCq = 3,
    DestroyCq = 4,
    Suspend = 5,
    Resume = 6,
    Flush = 7,
    GetFeature = 8,
    SetFeature = 9,
    AsyncEventRequest = 10,
    GetStats = 11,
}

// ============================================================================
// Completion Status
// ============================================================================

/// ACQエントリの status バイト
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminStatus {
    Success,
    ResourceAllocationFailure,
    BadOpcode,
    UnsupportedOpcode,
    MalformedRequest,
    /// 不正なパラメータ（extended_status に詳細）
    IllegalParameter,
    UnknownError,
    /// 定義外の値
    Unrecognized(u8),
}

impl AdminStatus {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => AdminStatus::Success,
            1 => AdminStatus::ResourceAllocationFailure,
            2 => AdminStatus::BadOpcode,
            3 => AdminStatus::UnsupportedOpcode,
            4 => AdminStatus::MalformedRequest,
            5 => AdminStatus::IllegalParameter,
            6 => AdminStatus::UnknownError,
            other => AdminStatus::Unrecognized(other),
        }
    }

    /// 呼び出し側へ返すエラーへ変換
    pub fn into_result(self) -> Result<()> {
        match self {
            AdminStatus::Success => Ok(()),
            AdminStatus::ResourceAllocationFailure => Err(EnaError::OutOfMemory),
            AdminStatus::BadOpcode
            | AdminStatus::UnsupportedOpcode
            | AdminStatus::MalformedRequest
            | AdminStatus::IllegalParameter
            | AdminStatus::UnknownError
            | AdminStatus::Unrecognized(_) => Err(EnaError::InvalidArgument),
        }
    }
}

impl core::fmt::Display for AdminStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AdminStatus::Success => write!(f, "success"),
            AdminStatus::ResourceAllocationFailure => write!(f, "resource allocation failure"),
            AdminStatus::BadOpcode => write!(f, "bad opcode"),
            AdminStatus::UnsupportedOpcode => write!(f, "unsupported opcode"),
            AdminStatus::MalformedRequest => write!(f, "malformed request"),
            AdminStatus::IllegalParameter => write!(f, "illegal parameter"),
            AdminStatus::UnknownError => write!(f, "unknown error"),
            AdminStatus::Unrecognized(raw) => write!(f, "unrecognized status {}", raw),
        }
    }
}

// ============================================================================
// Feature IDs
// ============================================================================

/// Get/Set Feature の機能ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FeatureId {
    DeviceAttributes = 1,
    MaxQueuesNum = 2,
    RssRedirectionTableConfig = 3,
    StatelessOffloadConfig = 11,
    RssHashFunction = 12,
    Mtu = 14,
    RssHashInput = 18,
    InterruptModeration = 20,
    AenqConfig = 26,
    LinkConfig = 27,
    HostAttrConfig = 28,
}

// ============================================================================
// AENQ groups / syndromes
// ============================================================================

/// AENQイベントグループ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum AenqGroup {
    LinkChange = 0,
    FatalError = 1,
    Warning = 2,
    Notification = 3,
    KeepAlive = 4,
}

impl AenqGroup {
    /// 定義済みグループ数
    pub const COUNT: usize = 5;

    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(AenqGroup::LinkChange),
            1 => Some(AenqGroup::FatalError),
            2 => Some(AenqGroup::Warning),
            3 => Some(AenqGroup::Notification),
            4 => Some(AenqGroup::KeepAlive),
            _ => None,
        }
    }

    /// AENQ設定機能の groups ビット
    pub const fn bit(self) -> u32 {
        1 << (self as u16)
    }
}

/// Notification グループのシンドローム
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum NotificationSyndrome {
    Suspend = 0,
    Resume = 1,
}

/// Warning グループのシンドローム
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum WarningSyndrome {
    Thermal = 0,
    LoggingFifo = 1,
    DirtyPage = 2,
    MaliciousMmioAccess = 3,
    CqFull = 4,
}

// ============================================================================
// Queue kinds
// ============================================================================

/// I/Oキューの方向（sq_identity ビット 7:5）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum QueueDirection {
    Tx = 1,
    Rx = 2,
}

/// SQディスクリプタの配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PlacementPolicy {
    /// ホストメモリ（デバイスがDMAで読む）
    Host = 1,
    /// デバイスメモリ（LLQ、ホストがプッシュ）
    Device = 3,
}

/// SQ/CQ の種別（Ethernet のみ）
pub const QUEUE_TYPE_ETH: u8 = 1;

/// 完了ポリシー: ディスクリプタ単位
pub const COMPLETION_POLICY_DESC: u8 = 0;

/// 統計種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatsType {
    Basic = 0,
    Extended = 1,
}

/// 統計スコープ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatsScope {
    SpecificQueue = 0,
    EthernetEntity = 1,
}
