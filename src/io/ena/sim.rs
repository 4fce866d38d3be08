// ============================================================================
// src/io/ena/sim.rs - Simulated ENA Device (test only)
// ============================================================================
//!
//! # 模擬デバイス
//!
//! HAL トレイトを実装し、デバイス側の振る舞いを再現する。
//!
//! - DMA メモリはヒープ上に確保し、仮想アドレスをそのままバスアドレスとする
//! - レジスタファイルと readless 読み出しの応答
//! - AQ ドアベルで SQ を読み、応答関数の結果を ACQ へ書く
//! - AENQ へのイベント投入
//! - DEV_CTL によるリセット状態遷移

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::collections::VecDeque;
use std::ptr::{self, NonNull};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering, fence};
use std::time::{Duration, Instant};

use super::commands::{
    AcqEntry, AenqEntry, AenqFeatureDesc, AqEntry, BasicStats, CreateCqCmd, CreateCqResp,
    CreateSqCmd, CreateSqResp, DeviceAttrFeatureDesc, GetFeatCmd, GetFeatResp, GetStatsCmd,
    LinkFeatureDesc, MmioReadLessResp, OffloadFeatureDesc, PHASE_MASK, QueueFeatureDesc,
};
use super::defs::{AdminOpcode, FeatureId, StatsType};
use super::regs::{DevControl, DevStatus, offsets};
use crate::io::dma::{DmaAllocator, DmaRegion};
use crate::io::hal::{Clock, RegisterBar};

/// 既定レジスタ値
pub const SIM_VERSION: u32 = 0x0000_0201;
pub const SIM_CTRL_VERSION: u32 = 0x0001_0001;
/// contiguous, reset timeout 5, dma width 48
pub const SIM_CAPS: u32 = 0x0000_300B;
pub const SIM_EXT_STATS: &str = "rx_drops: 5\ntx_timeouts: 0\n";

const DMA_ALIGN: usize = 4096;
const NUM_REGS: usize = (offsets::REGS_WINDOW_SIZE / 4) as usize;

/// 管理コマンドへの応答（None なら保留）
pub type Responder = Box<dyn FnMut(&AqEntry) -> Option<AcqEntry> + Send>;

/// デバイス側のリング状態
struct DeviceQueues {
    sq_head: u16,
    sq_phase: bool,
    cq_tail: u16,
    cq_phase: bool,
    aenq_tail: u16,
    aenq_phase: bool,
    /// 応答を保留中のコマンド
    held: VecDeque<AqEntry>,
    /// 受け取ったコマンドの履歴
    history: Vec<AqEntry>,
    phase_errors: u32,
}

impl DeviceQueues {
    const fn new() -> Self {
        Self {
            sq_head: 0,
            sq_phase: true,
            cq_tail: 0,
            cq_phase: true,
            aenq_tail: 0,
            aenq_phase: true,
            held: VecDeque::new(),
            history: Vec::new(),
            phase_errors: 0,
        }
    }
}

pub struct SimDevice {
    regs: Mutex<[u32; NUM_REGS]>,
    writes: Mutex<Vec<(u32, u32)>>,
    queues: Mutex<DeviceQueues>,
    responder: Mutex<Responder>,
    live_allocs: AtomicUsize,
    /// 残り確保可能回数（usize::MAX で無制限）
    alloc_budget: AtomicUsize,
    unresponsive: AtomicBool,
    reset_stuck: AtomicBool,
    doorbells: AtomicU32,
    udelays: AtomicU64,
    msleeps: AtomicU64,
    start: Instant,
}

impl SimDevice {
    pub fn new() -> Self {
        let mut regs = [0u32; NUM_REGS];
        regs[(offsets::VERSION / 4) as usize] = SIM_VERSION;
        regs[(offsets::CONTROLLER_VERSION / 4) as usize] = SIM_CTRL_VERSION;
        regs[(offsets::CAPS / 4) as usize] = SIM_CAPS;
        regs[(offsets::DEV_STS / 4) as usize] = DevStatus::READY.bits();
        Self {
            regs: Mutex::new(regs),
            writes: Mutex::new(Vec::new()),
            queues: Mutex::new(DeviceQueues::new()),
            responder: Mutex::new(Box::new(standard_reply)),
            live_allocs: AtomicUsize::new(0),
            alloc_budget: AtomicUsize::new(usize::MAX),
            unresponsive: AtomicBool::new(false),
            reset_stuck: AtomicBool::new(false),
            doorbells: AtomicU32::new(0),
            udelays: AtomicU64::new(0),
            msleeps: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    // ========================================================================
    // Knobs
    // ========================================================================

    pub fn set_reg(&self, offset: u32, value: u32) {
        self.regs.lock().unwrap()[(offset / 4) as usize] = value;
    }

    pub fn reg(&self, offset: u32) -> u32 {
        self.regs.lock().unwrap()[(offset / 4) as usize]
    }

    pub fn set_responder<F>(&self, f: F)
    where
        F: FnMut(&AqEntry) -> Option<AcqEntry> + Send + 'static,
    {
        *self.responder.lock().unwrap() = Box::new(f);
    }

    /// すべてのコマンドを保留する
    pub fn hold_all(&self) {
        self.set_responder(|_| None);
    }

    pub fn set_unresponsive(&self, on: bool) {
        self.unresponsive.store(on, Ordering::SeqCst);
    }

    pub fn set_reset_stuck(&self, on: bool) {
        self.reset_stuck.store(on, Ordering::SeqCst);
    }

    /// あと `n` 回だけ DMA 確保に成功させる
    pub fn fail_allocs_after(&self, n: usize) {
        self.alloc_budget.store(n, Ordering::SeqCst);
    }

    pub fn live_allocs(&self) -> usize {
        self.live_allocs.load(Ordering::SeqCst)
    }

    pub fn doorbells(&self) -> u32 {
        self.doorbells.load(Ordering::SeqCst)
    }

    pub fn udelays(&self) -> u64 {
        self.udelays.load(Ordering::SeqCst)
    }

    pub fn msleeps(&self) -> u64 {
        self.msleeps.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.udelays.store(0, Ordering::SeqCst);
        self.msleeps.store(0, Ordering::SeqCst);
    }

    /// `offset` への書き込み値（古い順）
    pub fn writes_to(&self, offset: u32) -> Vec<u32> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(off, _)| *off == offset)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn history(&self) -> Vec<AqEntry> {
        self.queues.lock().unwrap().history.clone()
    }

    pub fn held_count(&self) -> usize {
        self.queues.lock().unwrap().held.len()
    }

    pub fn phase_errors(&self) -> u32 {
        self.queues.lock().unwrap().phase_errors
    }

    /// 保留中のコマンドを数が揃うまで待つ
    pub fn wait_held(&self, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.held_count() < n {
            assert!(Instant::now() < deadline, "commands never arrived");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    // ========================================================================
    // Device-side actions
    // ========================================================================

    /// 条件に合う保留コマンドに `reply` で応答する
    pub fn complete_held<P>(&self, pred: P, reply: AcqEntry) -> bool
    where
        P: Fn(&AqEntry) -> bool,
    {
        let mut q = self.queues.lock().unwrap();
        let Some(pos) = q.held.iter().position(|c| pred(c)) else {
            return false;
        };
        let cmd = q.held.remove(pos).unwrap();
        self.post_completion(&mut q, cmd.command_id(), reply);
        true
    }

    /// 任意のコマンドIDで完了を書く
    pub fn post_raw_completion(&self, command_id: u16, reply: AcqEntry) {
        let mut q = self.queues.lock().unwrap();
        self.post_completion(&mut q, command_id, reply);
    }

    /// ACQ のスロットへエントリをそのまま書く（phase も呼び出し側が決める）
    pub fn write_acq_slot(&self, slot: usize, entry: AcqEntry) {
        let base = self.base(offsets::ACQ_BASE_LO, offsets::ACQ_BASE_HI);
        unsafe { write_mem(base + (slot * 64) as u64, entry) };
    }

    /// AENQ にイベントを1件書く
    pub fn push_aenq(&self, group: u16, syndrom: u16, data0: u32) {
        let base = self.base(offsets::AENQ_BASE_LO, offsets::AENQ_BASE_HI);
        let depth = (self.reg(offsets::AENQ_CAPS) & 0xFFFF) as u16;
        let mut q = self.queues.lock().unwrap();

        let mut entry = AenqEntry::default();
        entry.common.group = group;
        entry.common.syndrom = syndrom;
        entry.common.timestamp_low = q.aenq_tail as u32;
        entry.data[0] = data0;

        let slot = (q.aenq_tail & (depth - 1)) as u64;
        publish(
            base + slot * 64,
            entry,
            AenqEntry::FLAGS_OFFSET,
            q.aenq_phase,
            |e, f| e.common.flags = f,
        );

        q.aenq_tail = q.aenq_tail.wrapping_add(1);
        if q.aenq_tail & (depth - 1) == 0 {
            q.aenq_phase = !q.aenq_phase;
        }
    }

    fn base(&self, lo: u32, hi: u32) -> u64 {
        ((self.reg(hi) as u64) << 32) | self.reg(lo) as u64
    }

    fn post_completion(&self, q: &mut DeviceQueues, command_id: u16, mut reply: AcqEntry) {
        let base = self.base(offsets::ACQ_BASE_LO, offsets::ACQ_BASE_HI);
        let depth = (self.reg(offsets::ACQ_CAPS) & 0xFFFF) as u16;

        reply.common.command = command_id;
        reply.common.sq_head_indx = q.sq_head;
        let slot = (q.cq_tail & (depth - 1)) as u64;
        publish(
            base + slot * 64,
            reply,
            AcqEntry::FLAGS_OFFSET,
            q.cq_phase,
            |e, f| e.common.flags = f,
        );

        q.cq_tail = q.cq_tail.wrapping_add(1);
        if q.cq_tail & (depth - 1) == 0 {
            q.cq_phase = !q.cq_phase;
        }
    }

    fn on_admin_doorbell(&self, tail: u16) {
        self.doorbells.fetch_add(1, Ordering::SeqCst);
        let base = self.base(offsets::AQ_BASE_LO, offsets::AQ_BASE_HI);
        let depth = (self.reg(offsets::AQ_CAPS) & 0xFFFF) as u16;

        let mut q = self.queues.lock().unwrap();
        while q.sq_head != tail {
            let slot = (q.sq_head & (depth - 1)) as u64;
            let cmd: AqEntry = unsafe { read_mem(base + slot * 64) };
            if cmd.phase() != q.sq_phase {
                q.phase_errors += 1;
                break;
            }
            q.sq_head = q.sq_head.wrapping_add(1);
            if q.sq_head & (depth - 1) == 0 {
                q.sq_phase = !q.sq_phase;
            }
            q.history.push(cmd);

            let reply = (self.responder.lock().unwrap())(&cmd);
            match reply {
                Some(reply) => self.post_completion(&mut q, cmd.command_id(), reply),
                None => q.held.push_back(cmd),
            }
        }
    }

    fn on_mmio_read(&self, request: u32) {
        if self.unresponsive.load(Ordering::SeqCst) {
            return;
        }
        let addr = self.base(offsets::MMIO_RESP_LO, offsets::MMIO_RESP_HI);
        if addr == 0 {
            return;
        }
        let req_id = (request & 0xFFFF) as u16;
        let offset = (request >> 16) as u16;
        let value = self.reg(offset as u32);

        unsafe {
            write_mem(addr + MmioReadLessResp::REG_OFF_OFFSET as u64, offset);
            write_mem(addr + MmioReadLessResp::REG_VAL_OFFSET as u64, value);
            fence(Ordering::Release);
            write_mem(addr + MmioReadLessResp::REQ_ID_OFFSET as u64, req_id);
        }
    }

    fn on_dev_ctl(&self, value: u32) {
        let ctl = DevControl::from_bits_truncate(value);
        if !ctl.contains(DevControl::DEV_RESET) {
            let mut regs = self.regs.lock().unwrap();
            regs[(offsets::DEV_STS / 4) as usize] &= !DevStatus::RESET_IN_PROGRESS.bits();
            return;
        }

        {
            let mut regs = self.regs.lock().unwrap();
            if !self.reset_stuck.load(Ordering::SeqCst) {
                regs[(offsets::DEV_STS / 4) as usize] |= DevStatus::RESET_IN_PROGRESS.bits();
            }
            // リセットで応答アドレスは消える
            regs[(offsets::MMIO_RESP_LO / 4) as usize] = 0;
            regs[(offsets::MMIO_RESP_HI / 4) as usize] = 0;
        }
        *self.queues.lock().unwrap() = DeviceQueues::new();
    }
}

impl RegisterBar for SimDevice {
    fn write32(&self, offset: u32, value: u32) {
        self.writes.lock().unwrap().push((offset, value));
        match offset {
            offsets::AQ_DB => self.on_admin_doorbell(value as u16),
            offsets::MMIO_REG_READ => self.on_mmio_read(value),
            offsets::DEV_CTL => self.on_dev_ctl(value),
            _ => self.set_reg(offset, value),
        }
    }
}

impl DmaAllocator for SimDevice {
    fn alloc_coherent(&self, size: usize) -> Option<DmaRegion> {
        let budget = self.alloc_budget.load(Ordering::SeqCst);
        if budget == 0 {
            return None;
        }
        if budget != usize::MAX {
            self.alloc_budget.store(budget - 1, Ordering::SeqCst);
        }

        let layout = Layout::from_size_align(size.max(1), DMA_ALIGN).ok()?;
        let p = NonNull::new(unsafe { alloc_zeroed(layout) })?;
        self.live_allocs.fetch_add(1, Ordering::SeqCst);
        // 仮想アドレスをそのままバスアドレスにする
        Some(unsafe { DmaRegion::from_raw_parts(p, p.as_ptr() as u64, size) })
    }

    fn free_coherent(&self, region: DmaRegion) {
        let layout = Layout::from_size_align(region.len().max(1), DMA_ALIGN).unwrap();
        unsafe { dealloc(region.as_ptr(), layout) };
        self.live_allocs.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Clock for SimDevice {
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn udelay(&self, _us: u32) {
        self.udelays.fetch_add(1, Ordering::SeqCst);
    }

    fn msleep(&self, ms: u32) {
        self.msleeps.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(ms as u64));
    }

    fn relax(&self) {
        std::thread::yield_now();
    }
}

// ============================================================================
// Memory helpers
// ============================================================================

unsafe fn read_mem<T: Copy>(addr: u64) -> T {
    unsafe { ptr::read_volatile(addr as *const T) }
}

unsafe fn write_mem<T: Copy>(addr: u64, value: T) {
    unsafe { ptr::write_volatile(addr as *mut T, value) }
}

/// 本体を書いてから phase を含む flags バイトを書く
fn publish<T: Copy>(
    addr: u64,
    mut entry: T,
    flags_offset: usize,
    phase: bool,
    set_flags: fn(&mut T, u8),
) {
    let stale = if phase { 0 } else { PHASE_MASK };
    set_flags(&mut entry, stale);
    unsafe {
        write_mem(addr, entry);
        fence(Ordering::Release);
        write_mem(addr + flags_offset as u64, if phase { PHASE_MASK } else { 0u8 });
    }
}

// ============================================================================
// Standard responses
// ============================================================================

pub const SIM_MAC: [u8; 6] = [0x02, 0x00, 0x5E, 0x10, 0x20, 0x30];
pub const SIM_MTU: u32 = 9216;
pub const SIM_CQ_IDX: u16 = 3;
pub const SIM_SQ_IDX: u16 = 7;
pub const SIM_SQ_DB: u32 = 0x1000;
pub const SIM_CQ_UNMASK: u32 = 0x2000;

/// ステータスだけの応答
pub fn reply_status(status: u8) -> AcqEntry {
    let mut e = AcqEntry::default();
    e.common.status = status;
    e
}

/// 各コマンドにもっともらしく応答する
pub fn standard_reply(cmd: &AqEntry) -> Option<AcqEntry> {
    let ok = AcqEntry::default();
    let reply = match cmd.opcode() {
        op if op == AdminOpcode::GetFeature as u8 => {
            let get: GetFeatCmd = cmd.command();
            let resp = match get.feat_common.feature_id {
                id if id == FeatureId::DeviceAttributes as u8 => {
                    GetFeatResp::from_desc(&DeviceAttrFeatureDesc {
                        impl_id: 1,
                        device_version: SIM_VERSION,
                        supported_features: 0x0C00_4006,
                        phys_addr_width: 48,
                        virt_addr_width: 48,
                        mac_addr: SIM_MAC,
                        max_mtu: SIM_MTU,
                        ..Default::default()
                    })
                }
                id if id == FeatureId::MaxQueuesNum as u8 => {
                    GetFeatResp::from_desc(&QueueFeatureDesc {
                        max_sq_num: 8,
                        max_sq_depth: 1024,
                        max_cq_num: 8,
                        max_cq_depth: 1024,
                        ..Default::default()
                    })
                }
                id if id == FeatureId::AenqConfig as u8 => {
                    GetFeatResp::from_desc(&AenqFeatureDesc {
                        supported_groups: 0x1F,
                        enabled_groups: 0x1F,
                    })
                }
                id if id == FeatureId::StatelessOffloadConfig as u8 => {
                    GetFeatResp::from_desc(&OffloadFeatureDesc {
                        tx: 0x3,
                        rx_supported: 0x1,
                        rx_enabled: 0x1,
                    })
                }
                id if id == FeatureId::LinkConfig as u8 => {
                    GetFeatResp::from_desc(&LinkFeatureDesc {
                        speed: 25_000,
                        supported: 0x7,
                        flags: 0x3,
                    })
                }
                _ => return Some(reply_status(3)),
            };
            ok.with_response(&resp)
        }
        op if op == AdminOpcode::SetFeature as u8 => ok,
        op if op == AdminOpcode::CreateCq as u8 => {
            let c: CreateCqCmd = cmd.command();
            ok.with_response(&CreateCqResp {
                cq_idx: SIM_CQ_IDX,
                cq_actual_depth: c.cq_depth,
                cq_doorbell_offset: 0,
                cq_head_db_offset: 0,
                cq_interrupt_unmask_register: SIM_CQ_UNMASK,
                cq_interrupt_unmask_value: 0x4000_0000,
                cq_interrupt_moderation_register: 0,
            })
        }
        op if op == AdminOpcode::CreateSq as u8 => {
            let c: CreateSqCmd = cmd.command();
            ok.with_response(&CreateSqResp {
                sq_idx: SIM_SQ_IDX,
                sq_actual_depth: c.sq_depth,
                sq_doorbell_offset: SIM_SQ_DB,
                llq_descriptors_offset: 0x8000,
                llq_headers_offset: 0x4000,
            })
        }
        op if op == AdminOpcode::DestroySq as u8 || op == AdminOpcode::DestroyCq as u8 => ok,
        op if op == AdminOpcode::GetStats as u8 => {
            let s: GetStatsCmd = cmd.command();
            if s.stats_type == StatsType::Extended as u8 {
                let addr = s.control_buffer.address.addr();
                let text = SIM_EXT_STATS.as_bytes();
                let n = text.len().min(s.control_buffer.length as usize - 1);
                for (i, b) in text[..n].iter().enumerate() {
                    unsafe { write_mem(addr + i as u64, *b) };
                }
                ok
            } else {
                ok.with_response(&BasicStats {
                    tx_bytes_low: 1000,
                    tx_pkts_low: 10,
                    rx_bytes_low: 2000,
                    rx_bytes_high: 1,
                    rx_pkts_low: 20,
                    rx_drops_low: 5,
                    ..Default::default()
                })
            }
        }
        _ => reply_status(2),
    };
    Some(reply)
}
