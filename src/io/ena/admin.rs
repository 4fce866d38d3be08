// ============================================================================
// src/io/ena/admin.rs - Admin Queue Engine
// ============================================================================
//!
//! # 管理キュー (AQ/ACQ)
//!
//! ## 送信
//! 1. 停止中なら `DeviceNotReady`、満杯なら `QueueFull`
//! 2. 次のコマンドIDのコンテキストを確保
//! 3. コマンドIDと phase を刻印してスロットへ書き込み
//! 4. tail を進めてドアベル (AQ_DB) を書く
//!
//! 2〜4 は同じロックの中で行う。
//!
//! ## 回収
//! ACQ の head から phase が一致する間だけ読み進め、コマンドIDで
//! コンテキストへ振り分ける。完了順は送信順と一致しなくてよい。

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::mem::size_of;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering, fence};
use log::{debug, error, warn};
use spin::Mutex;

use super::commands::{
    AcqCommonDesc, AcqEntry, AdminCommand, AdminResponse, AqCommonDesc, AqEntry, PHASE_MASK,
};
use super::completion::{
    CmdStatus, CompletionContext, CompletionSource, CompletionWaiter, EventWaiter, PollingWaiter,
    WaitEvent, WaitOutcome,
};
use super::config::{AdminConfig, CompletionMode};
use super::defs::AdminStatus;
use super::error::{EnaError, Result};
use super::regs::{offsets, queue_caps};
use super::ring::RingCursor;
use crate::io::dma::DmaRing;
use crate::io::hal::EnaHal;

// ============================================================================
// Statistics
// ============================================================================

/// 管理キュー統計
#[derive(Debug, Default)]
pub struct AdminStats {
    pub submitted_cmd: AtomicU64,
    pub completed_cmd: AtomicU64,
    pub aborted_cmd: AtomicU64,
    pub out_of_space: AtomicU64,
    pub no_completion: AtomicU64,
}

/// 統計のスナップショット
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdminStatsSnapshot {
    pub submitted_cmd: u64,
    pub completed_cmd: u64,
    pub aborted_cmd: u64,
    pub out_of_space: u64,
    pub no_completion: u64,
}

impl AdminStats {
    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AdminStatsSnapshot {
        AdminStatsSnapshot {
            submitted_cmd: self.submitted_cmd.load(Ordering::Relaxed),
            completed_cmd: self.completed_cmd.load(Ordering::Relaxed),
            aborted_cmd: self.aborted_cmd.load(Ordering::Relaxed),
            out_of_space: self.out_of_space.load(Ordering::Relaxed),
            no_completion: self.no_completion.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// Admin Queue
// ============================================================================

/// ロックで保護される部分
struct AdminInner<H: EnaHal> {
    sq: DmaRing<H, AqEntry>,
    sq_cursor: RingCursor,
    cq: DmaRing<H, AcqEntry>,
    cq_cursor: RingCursor,
    contexts: Vec<CompletionContext>,
    curr_cmd_id: u16,
    running: bool,
}

/// 管理キュー
pub struct AdminQueue<H: EnaHal> {
    hal: Arc<H>,
    depth: u16,
    inner: Mutex<AdminInner<H>>,
    /// コマンドIDごとの完了通知（ロック外で待つ）
    events: Box<[WaitEvent]>,
    outstanding: AtomicU32,
    polling: AtomicBool,
    cmd_timeout_us: u64,
    abort_poll_interval_ms: u32,
    polling_waiter: PollingWaiter,
    event_waiter: EventWaiter,
    stats: AdminStats,
}

impl<H: EnaHal> AdminQueue<H> {
    /// リングとコンテキストを確保し、ベースアドレスと caps をデバイスに登録する
    ///
    /// 生成直後は停止状態。`set_running_state(true)` で受付を開始する。
    pub fn new(hal: Arc<H>, config: &AdminConfig) -> Result<Self> {
        config.validate()?;
        let depth = config.admin_queue_depth;

        let sq: DmaRing<H, AqEntry> =
            DmaRing::new(&hal, depth).ok_or(EnaError::AllocationFailure)?;
        let cq: DmaRing<H, AcqEntry> =
            DmaRing::new(&hal, depth).ok_or(EnaError::AllocationFailure)?;

        let contexts = (0..depth).map(|_| CompletionContext::new()).collect();
        let events = (0..depth).map(|_| WaitEvent::new()).collect();

        let sq_addr = sq.dma_addr();
        let cq_addr = cq.dma_addr();
        hal.write32(offsets::AQ_BASE_LO, sq_addr as u32);
        hal.write32(offsets::AQ_BASE_HI, (sq_addr >> 32) as u32);
        hal.write32(offsets::ACQ_BASE_LO, cq_addr as u32);
        hal.write32(offsets::ACQ_BASE_HI, (cq_addr >> 32) as u32);
        hal.write32(offsets::AQ_CAPS, queue_caps(depth, size_of::<AqEntry>()));
        hal.write32(offsets::ACQ_CAPS, queue_caps(depth, size_of::<AcqEntry>()));

        debug!(
            "ENA: admin queue depth={} sq={:#x} cq={:#x}",
            depth, sq_addr, cq_addr
        );

        Ok(Self {
            hal,
            depth,
            inner: Mutex::new(AdminInner {
                sq,
                sq_cursor: RingCursor::new(depth)?,
                cq,
                cq_cursor: RingCursor::new(depth)?,
                contexts,
                curr_cmd_id: 0,
                running: false,
            }),
            events,
            outstanding: AtomicU32::new(0),
            polling: AtomicBool::new(config.completion_mode == CompletionMode::Polling),
            cmd_timeout_us: config.cmd_timeout_us,
            abort_poll_interval_ms: config.abort_poll_interval_ms,
            polling_waiter: PollingWaiter {
                interval_ms: config.poll_interval_ms,
            },
            event_waiter: EventWaiter,
            stats: AdminStats::default(),
        })
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    pub fn sq_dma_addr(&self) -> u64 {
        self.inner.lock().sq.dma_addr()
    }

    pub fn cq_dma_addr(&self) -> u64 {
        self.inner.lock().cq.dma_addr()
    }

    pub fn sq_cursor(&self) -> RingCursor {
        self.inner.lock().sq_cursor
    }

    pub fn cq_cursor(&self) -> RingCursor {
        self.inner.lock().cq_cursor
    }

    /// 完了待ちのコマンド数
    pub fn outstanding(&self) -> u32 {
        self.outstanding.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> AdminStatsSnapshot {
        self.stats.snapshot()
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn set_running_state(&self, running: bool) {
        self.inner.lock().running = running;
    }

    pub fn running_state(&self) -> bool {
        self.inner.lock().running
    }

    pub fn set_polling_mode(&self, polling: bool) {
        self.polling.store(polling, Ordering::Release);
    }

    pub fn polling_mode(&self) -> bool {
        self.polling.load(Ordering::Acquire)
    }

    // ========================================================================
    // Execute
    // ========================================================================

    /// コマンドを送信し、完了を待つ
    ///
    /// `cmd` の先頭 `cmd_size` バイトを送信し、完了エントリの先頭
    /// `comp_size` バイトを `comp` へコピーする。
    pub fn execute_command(
        &self,
        cmd: &AqEntry,
        cmd_size: usize,
        comp: &mut AcqEntry,
        comp_size: usize,
    ) -> Result<()> {
        let cmd_id = self.submit(cmd, cmd_size, comp_size)?;
        let deadline = self.hal.now_us().saturating_add(self.cmd_timeout_us);

        let outcome = if self.polling_mode() {
            self.polling_waiter.wait(self, cmd_id, deadline)
        } else {
            self.event_waiter.wait(self, cmd_id, deadline)
        };

        self.finish(cmd_id, outcome, comp)
    }

    /// 型付きコマンドを実行し、応答を `R` として返す
    pub fn execute<C: AdminCommand, R: AdminResponse>(&self, cmd: &C) -> Result<R> {
        let entry = AqEntry::from_command(cmd);
        let mut comp = AcqEntry::default();
        self.execute_command(
            &entry,
            size_of::<AqCommonDesc>() + size_of::<C>(),
            &mut comp,
            size_of::<AcqCommonDesc>() + size_of::<R>(),
        )?;
        Ok(comp.response())
    }

    /// 応答ペイロードを持たないコマンド
    pub fn execute_no_resp<C: AdminCommand>(&self, cmd: &C) -> Result<()> {
        let entry = AqEntry::from_command(cmd);
        let mut comp = AcqEntry::default();
        self.execute_command(
            &entry,
            size_of::<AqCommonDesc>() + size_of::<C>(),
            &mut comp,
            size_of::<AcqCommonDesc>(),
        )
    }

    fn submit(&self, cmd: &AqEntry, cmd_size: usize, comp_size: usize) -> Result<u16> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if !inner.running {
            debug!("ENA: admin queue is not running");
            return Err(EnaError::DeviceNotReady);
        }

        if inner.sq_cursor.is_full() {
            debug!("ENA: admin queue is full");
            AdminStats::inc(&self.stats.out_of_space);
            return Err(EnaError::QueueFull);
        }

        let cmd_id = inner.curr_cmd_id;
        let ctx = &mut inner.contexts[cmd_id as usize];
        if ctx.occupied {
            error!("ENA: completion context {} is occupied", cmd_id);
            return Err(EnaError::DuplicateCommand);
        }
        inner.curr_cmd_id = (cmd_id + 1) & (self.depth - 1);

        ctx.capture(cmd.opcode(), comp_size.min(size_of::<AcqEntry>()));
        self.events[cmd_id as usize].reset();
        self.outstanding.fetch_add(1, Ordering::AcqRel);

        let mut entry = cmd.truncated(cmd_size);
        entry.stamp(cmd_id, inner.sq_cursor.phase());

        #[cfg(feature = "verbose_logging")]
        debug!("ENA: submit cmd_id={} entry={:?}", cmd_id, entry);

        inner.sq.write(inner.sq_cursor.tail_slot(), entry);
        inner.sq_cursor.produce();

        // エントリの書き込みをドアベルより先に見せる
        fence(Ordering::SeqCst);
        self.hal
            .write32(offsets::AQ_DB, inner.sq_cursor.tail() as u32);
        AdminStats::inc(&self.stats.submitted_cmd);

        Ok(cmd_id)
    }

    fn finish(&self, cmd_id: u16, outcome: WaitOutcome, comp: &mut AcqEntry) -> Result<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let ctx = &mut inner.contexts[cmd_id as usize];

        let result = match outcome {
            WaitOutcome::Completed => {
                ctx.response.copy_prefix_to(comp, ctx.comp_size);
                let status = AdminStatus::from_raw(ctx.comp_status);
                if status != AdminStatus::Success {
                    error!(
                        "ENA: admin command opcode={} failed: {}",
                        ctx.cmd_opcode, status
                    );
                }
                status.into_result()
            }
            WaitOutcome::Aborted => {
                debug!("ENA: cmd_id={} aborted", cmd_id);
                Err(EnaError::Aborted)
            }
            WaitOutcome::TimedOut => {
                error!(
                    "ENA: no completion for cmd_id={} opcode={}, stopping admin queue",
                    cmd_id, ctx.cmd_opcode
                );
                AdminStats::inc(&self.stats.no_completion);
                ctx.status = CmdStatus::Failed;
                inner.running = false;
                Err(EnaError::Timeout)
            }
        };

        inner.contexts[cmd_id as usize].release();
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
        result
    }

    // ========================================================================
    // Completion processing
    // ========================================================================

    /// ACQ を回収し、処理したエントリ数を返す（割り込みハンドラ・ポーリングから）
    pub fn drain_completions(&self) -> u16 {
        let mut guard = self.inner.lock();
        self.drain_locked(&mut guard)
    }

    fn drain_locked(&self, inner: &mut AdminInner<H>) -> u16 {
        let mut cursor = inner.cq_cursor;
        let mut count: u16 = 0;

        loop {
            let slot = cursor.head_slot();
            let flags: u8 = inner.cq.read_field(slot, AcqEntry::FLAGS_OFFSET);
            if (flags & PHASE_MASK != 0) != cursor.phase() {
                break;
            }
            // phase を見てから本体を読む
            fence(Ordering::Acquire);
            let entry = inner.cq.read(slot);
            self.handle_single_completion(inner, &entry);

            cursor.consume();
            count += 1;
        }

        inner.cq_cursor.consume_n(count);
        inner.sq_cursor.retire(count);
        if count > 0 {
            self.stats
                .completed_cmd
                .fetch_add(count as u64, Ordering::Relaxed);
        }
        count
    }

    fn handle_single_completion(&self, inner: &mut AdminInner<H>, entry: &AcqEntry) {
        let cmd_id = entry.command_id();
        if cmd_id >= self.depth {
            error!(
                "ENA: completion with command id {} beyond queue depth {}, stopping admin queue",
                cmd_id, self.depth
            );
            inner.running = false;
            return;
        }

        let ctx = &mut inner.contexts[cmd_id as usize];

        if !ctx.occupied || ctx.status != CmdStatus::Submitted {
            warn!(
                "ENA: completion for command id {} not waiting (status {:?})",
                cmd_id, ctx.status
            );
            return;
        }

        ctx.complete(entry);
        self.events[cmd_id as usize].signal();
    }

    // ========================================================================
    // Abort
    // ========================================================================

    /// 完了待ちの全コマンドを中断させる
    ///
    /// 完了済みで待機側の回収を待っているコンテキストはそのまま残す。
    pub fn abort_all(&self) {
        let mut guard = self.inner.lock();
        for (cmd_id, ctx) in guard.contexts.iter_mut().enumerate() {
            if !ctx.occupied || ctx.status != CmdStatus::Submitted {
                continue;
            }
            ctx.status = CmdStatus::Aborted;
            self.events[cmd_id].signal();
            AdminStats::inc(&self.stats.aborted_cmd);
        }
    }

    /// 中断したコマンドの待機側がすべて戻るまで待つ
    pub fn wait_for_abort_completion(&self) {
        while self.outstanding() > 0 {
            self.hal.msleep(self.abort_poll_interval_ms);
        }
    }
}

impl<H: EnaHal> CompletionSource for AdminQueue<H> {
    fn now_us(&self) -> u64 {
        self.hal.now_us()
    }

    fn msleep(&self, ms: u32) {
        self.hal.msleep(ms);
    }

    fn relax(&self) {
        self.hal.relax();
    }

    fn status(&self, cmd_id: u16) -> CmdStatus {
        self.inner.lock().contexts[cmd_id as usize].status
    }

    fn poll_completions(&self, cmd_id: u16) -> CmdStatus {
        let mut guard = self.inner.lock();
        self.drain_locked(&mut guard);
        guard.contexts[cmd_id as usize].status
    }

    fn event(&self, cmd_id: u16) -> &WaitEvent {
        &self.events[cmd_id as usize]
    }
}
