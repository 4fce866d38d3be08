// ============================================================================
// src/lib.rs - ENA Admin/Completion Queue Engine
// ============================================================================
//!
//! # ENA 管理キュー・プロトコルエンジン
//!
//! Elastic Network Adapter の管理コマンドキュー (AQ)、管理完了キュー (ACQ)、
//! 非同期イベント通知キュー (AENQ) を駆動する `no_std` ライブラリ。
//!
//! ## モジュール構成
//! - `io::hal`: レジスタ書き込み・時刻・遅延のプラットフォーム抽象
//! - `io::dma`: コヒーレントDMA領域
//! - `io::ena`: プロトコルエンジン本体
//!
//! デバイスはグローバル変数ではなく `EnaDevice` の値として保持する。

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod io;

pub use io::dma::{CoherentBuffer, DmaAllocator, DmaRegion};
pub use io::ena::{
    AdminConfig, AdminQueue, AdminStatus, Aenq, AenqEntry, AenqGroup, AenqHandlers, AcqEntry,
    AqEntry, CompletionMode, EnaDevice, EnaError, IoQueueParams, MmioReader, Result,
};
pub use io::hal::{Clock, EnaHal, RegisterBar};
