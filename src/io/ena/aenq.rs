// ============================================================================
// src/io/ena/aenq.rs - Asynchronous Event Notification Queue
// ============================================================================
//!
//! # AENQ
//!
//! デバイスが一方的に書き込むイベントリング。ホストは割り込み（または
//! ポーリング）で phase が一致する間だけ読み進め、グループごとの
//! ハンドラへ振り分け、最後に head をドアベルへ書き戻す。
//!
//! head は `depth` から始まる（スロット0、phase 1）。

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::mem::size_of;
use core::sync::atomic::{Ordering, fence};
use log::{debug, error};
use spin::Mutex;

use super::commands::{AenqEntry, PHASE_MASK};
use super::defs::{AenqGroup, MAX_AENQ_HANDLERS};
use super::error::{EnaError, Result};
use super::regs::{offsets, queue_caps};
use super::ring::RingCursor;
use crate::io::dma::DmaRing;
use crate::io::hal::EnaHal;

/// イベントハンドラ
pub type AenqHandler = Box<dyn Fn(&AenqEntry) + Send + Sync>;

// ============================================================================
// Handler table
// ============================================================================

/// グループIDで引くハンドラ表と、未登録グループ用のフォールバック
pub struct AenqHandlers {
    handlers: Vec<Option<AenqHandler>>,
    unimplemented: AenqHandler,
}

impl AenqHandlers {
    /// フォールバックだけを持つ表
    pub fn new(unimplemented: AenqHandler) -> Self {
        Self {
            handlers: (0..MAX_AENQ_HANDLERS).map(|_| None).collect(),
            unimplemented,
        }
    }

    /// 未登録イベントをデバッグログに出すだけの表
    pub fn logging() -> Self {
        Self::new(Box::new(|e: &AenqEntry| {
            debug!(
                "ENA: unhandled AENQ event group={} syndrom={}",
                e.group(),
                e.syndrom()
            );
        }))
    }

    /// 生のグループIDにハンドラを登録
    pub fn set_raw(&mut self, group: u16, handler: AenqHandler) -> Result<&mut Self> {
        let slot = self
            .handlers
            .get_mut(group as usize)
            .ok_or(EnaError::InvalidArgument)?;
        *slot = Some(handler);
        Ok(self)
    }

    /// 定義済みグループにハンドラを登録
    pub fn set(&mut self, group: AenqGroup, handler: AenqHandler) -> &mut Self {
        self.handlers[group as usize] = Some(handler);
        self
    }

    /// グループのハンドラ（なければフォールバック）
    pub fn get(&self, group: u16) -> &AenqHandler {
        match self.handlers.get(group as usize) {
            Some(Some(handler)) => handler,
            _ => &self.unimplemented,
        }
    }
}

// ============================================================================
// AENQ
// ============================================================================

/// 非同期イベント通知キュー
pub struct Aenq<H: EnaHal> {
    hal: Arc<H>,
    depth: u16,
    ring: DmaRing<H, AenqEntry>,
    cursor: Mutex<RingCursor>,
    handlers: AenqHandlers,
}

impl<H: EnaHal> Aenq<H> {
    /// リングを確保し、ベースアドレスと caps をデバイスに登録
    pub fn new(hal: Arc<H>, depth: u16, handlers: AenqHandlers) -> Result<Self> {
        let cursor = RingCursor::with_head(depth, depth)?;
        let ring: DmaRing<H, AenqEntry> =
            DmaRing::new(&hal, depth).ok_or(EnaError::AllocationFailure)?;

        let addr = ring.dma_addr();
        hal.write32(offsets::AENQ_BASE_LO, addr as u32);
        hal.write32(offsets::AENQ_BASE_HI, (addr >> 32) as u32);
        hal.write32(offsets::AENQ_CAPS, queue_caps(depth, size_of::<AenqEntry>()));

        Ok(Self {
            hal,
            depth,
            ring,
            cursor: Mutex::new(cursor),
            handlers,
        })
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    pub fn dma_addr(&self) -> u64 {
        self.ring.dma_addr()
    }

    pub fn cursor(&self) -> RingCursor {
        *self.cursor.lock()
    }

    /// 全スロットが空いていることをデバイスへ通知し、イベント送信を許可する
    pub fn enable(&self) {
        let cursor = self.cursor.lock();
        if cursor.head() != self.depth {
            error!(
                "ENA: AENQ enabled with head {} (expected {})",
                cursor.head(),
                self.depth
            );
        }
        self.hal
            .write32(offsets::AENQ_HEAD_DB, self.depth as u32);
    }

    /// 到着済みイベントを処理し、処理件数を返す
    pub fn handle_interrupt(&self) -> u16 {
        let mut cursor = self.cursor.lock();
        let mut processed: u16 = 0;

        loop {
            let slot = cursor.head_slot();
            let flags: u8 = self.ring.read_field(slot, AenqEntry::FLAGS_OFFSET);
            if (flags & PHASE_MASK != 0) != cursor.phase() {
                break;
            }
            fence(Ordering::Acquire);
            let entry = self.ring.read(slot);

            debug!(
                "ENA: AENQ group={} syndrom={} timestamp={}",
                entry.group(),
                entry.syndrom(),
                entry.timestamp()
            );
            (self.handlers.get(entry.group()))(&entry);

            cursor.consume();
            processed += 1;
        }

        if processed > 0 {
            self.hal
                .write32(offsets::AENQ_HEAD_DB, cursor.head() as u32);
        }
        processed
    }
}
