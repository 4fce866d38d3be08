// ============================================================================
// src/io/ena/mod.rs - ENA Admin Engine Module
// ============================================================================
//!
//! # ENA管理エンジン
//!
//! Elastic Network Adapter の管理キュー・完了キュー・非同期イベント通知
//! キューを駆動するプロトコルエンジン。
//!
//! ## モジュール構成
//! - `defs`: 定数・オペコード・ステータス
//! - `error`: エラー型
//! - `regs`: レジスタオフセットとビット定義
//! - `commands`: AQ/ACQ/AENQ ディスクリプタ
//! - `ring`: phase 付きリングカーソル
//! - `config`: タイミング・深度の設定
//! - `mmio`: readless レジスタ読み出し
//! - `completion`: 完了コンテキストと待機戦略
//! - `admin`: 管理キュー
//! - `aenq`: 非同期イベント通知キュー
//! - `device`: デバイスのライフサイクル
//! - `features`: Get/Set Feature と統計
//! - `io_queue`: I/Oキューの生成・破棄

pub mod admin;
pub mod aenq;
pub mod commands;
pub mod completion;
pub mod config;
pub mod defs;
pub mod device;
pub mod error;
pub mod features;
pub mod io_queue;
pub mod mmio;
pub mod regs;
pub mod ring;

#[cfg(test)]
mod sim;

// ============================================================================
// Re-exports
// ============================================================================

pub use admin::{AdminQueue, AdminStatsSnapshot};
pub use aenq::{Aenq, AenqHandler, AenqHandlers};
pub use commands::{AcqEntry, AdminCommand, AdminResponse, AenqEntry, AqEntry};
pub use config::{AdminConfig, CompletionMode};
pub use defs::{AdminOpcode, AdminStatus, AenqGroup, FeatureId, PlacementPolicy, QueueDirection};
pub use device::EnaDevice;
pub use error::{EnaError, Result};
pub use features::DeviceFeatures;
pub use io_queue::{IoCq, IoQueueParams, IoSq};
pub use mmio::MmioReader;
pub use ring::RingCursor;
