// ============================================================================
// src/io/ena/error.rs - ENA Error Types
// ============================================================================
//!
//! # ENAエラー型
//!
//! 管理キュー、レジスタアクセス、キュー作成で使用するエラー型の定義。

/// ENAエラー型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnaError {
    /// 管理キューが停止中、またはデバイスが準備未完了
    DeviceNotReady,
    /// サブミッションリングに空きがない
    QueueFull,
    /// 同じコマンドIDのコンテキストが使用中
    DuplicateCommand,
    /// 完了・レジスタ応答・リセットのタイムアウト
    Timeout,
    /// コマンドが中断された
    Aborted,
    /// デバイスのリソース確保失敗
    OutOfMemory,
    /// 無効なパラメータ（デバイス拒否を含む）
    InvalidArgument,
    /// ホスト側DMAメモリの確保失敗
    AllocationFailure,
    /// デバイス状態がこの操作を許さない
    InvalidState,
    /// デバイス/コントローラのバージョンが古い
    VersionMismatch,
    /// 無効なI/OキューID
    InvalidQueueId,
    /// デバイスが要求深度を確保できない
    NoSpace,
}

impl core::fmt::Display for EnaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EnaError::DeviceNotReady => write!(f, "ENA admin queue not running"),
            EnaError::QueueFull => write!(f, "ENA admin queue full"),
            EnaError::DuplicateCommand => write!(f, "ENA command id already in use"),
            EnaError::Timeout => write!(f, "ENA timeout"),
            EnaError::Aborted => write!(f, "ENA command aborted"),
            EnaError::OutOfMemory => write!(f, "ENA device out of resources"),
            EnaError::InvalidArgument => write!(f, "Invalid argument"),
            EnaError::AllocationFailure => write!(f, "DMA allocation failed"),
            EnaError::InvalidState => write!(f, "ENA device in invalid state"),
            EnaError::VersionMismatch => write!(f, "ENA version too old"),
            EnaError::InvalidQueueId => write!(f, "Invalid ENA queue id"),
            EnaError::NoSpace => write!(f, "ENA queue depth not granted"),
        }
    }
}

/// ENA操作の結果型
pub type Result<T> = core::result::Result<T, EnaError>;
