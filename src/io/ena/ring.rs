// ============================================================================
// src/io/ena/ring.rs - Phase-Tagged Ring Cursors
// ============================================================================
//!
//! # リングカーソル
//!
//! head/tail は u16 のフリーランニングカウンタで、スロットは
//! `pos & (depth - 1)`。深度は2の冪なので 2^16 での折り返しとも整合する。
//!
//! phase ビットの扱い:
//! - 生産側 (AQ): tail がスロット0に戻るたびに反転
//! - 消費側 (ACQ/AENQ): head がスロット0に戻るたびに期待値を反転
//!
//! 初期 phase は 1（ゼロクリアされたリングは「未生産」に見える）。

use super::error::{EnaError, Result};

// ============================================================================
// Free functions
// ============================================================================

/// `pos` のスロット番号
#[inline]
pub fn slot_index(pos: u16, depth: u16) -> usize {
    (pos & (depth - 1)) as usize
}

/// `pos` を1つ進め、スロット0に戻ったら phase を反転
#[inline]
pub fn advance(pos: u16, phase: bool, depth: u16) -> (u16, bool) {
    let next = pos.wrapping_add(1);
    if next & (depth - 1) == 0 {
        (next, !phase)
    } else {
        (next, phase)
    }
}

/// 生産可能なエントリ数（1スロットは常に空ける）
#[inline]
pub fn space_available(tail: u16, head: u16, depth: u16) -> u16 {
    (depth - 1).saturating_sub(tail.wrapping_sub(head))
}

// ============================================================================
// RingCursor
// ============================================================================

/// リング1本分の head/tail/phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingCursor {
    depth: u16,
    head: u16,
    tail: u16,
    phase: bool,
}

impl RingCursor {
    /// head = tail = 0, phase = 1
    pub fn new(depth: u16) -> Result<Self> {
        Self::with_head(depth, 0)
    }

    /// 初期 head を指定（AENQ は head = depth から始まる）
    pub fn with_head(depth: u16, head: u16) -> Result<Self> {
        if depth == 0 || !depth.is_power_of_two() {
            return Err(EnaError::InvalidArgument);
        }
        Ok(Self {
            depth,
            head,
            tail: head,
            phase: true,
        })
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    pub fn head(&self) -> u16 {
        self.head
    }

    pub fn tail(&self) -> u16 {
        self.tail
    }

    pub fn phase(&self) -> bool {
        self.phase
    }

    /// 生産済み・未回収のエントリ数
    pub fn in_flight(&self) -> u16 {
        self.tail.wrapping_sub(self.head)
    }

    pub fn space_available(&self) -> u16 {
        space_available(self.tail, self.head, self.depth)
    }

    pub fn is_full(&self) -> bool {
        self.space_available() == 0
    }

    /// 次に生産するスロット
    pub fn tail_slot(&self) -> usize {
        slot_index(self.tail, self.depth)
    }

    /// 次に消費するスロット
    pub fn head_slot(&self) -> usize {
        slot_index(self.head, self.depth)
    }

    /// 生産側: tail を進める（phase は tail に追従）
    pub fn produce(&mut self) {
        let (tail, phase) = advance(self.tail, self.phase, self.depth);
        self.tail = tail;
        self.phase = phase;
    }

    /// 消費側: head を進める（期待 phase は head に追従）
    pub fn consume(&mut self) {
        let (head, phase) = advance(self.head, self.phase, self.depth);
        self.head = head;
        self.phase = phase;
    }

    /// 消費側: `n` 個まとめて進める
    pub fn consume_n(&mut self, n: u16) {
        for _ in 0..n {
            self.consume();
        }
    }

    /// 生産側: 完了済みの `n` 個を回収（phase は変えない）
    pub fn retire(&mut self, n: u16) {
        self.head = self.head.wrapping_add(n);
    }
}
