// ============================================================================
// src/io/ena/io_queue.rs - I/O Queue Provisioning
// ============================================================================
//!
//! # I/Oキューの生成と破棄
//!
//! 1つのキューIDに SQ と CQ を1組ずつ作る。CQ を先に作成し、
//! 返ってきた CQ インデックスを SQ 作成コマンドに載せる。
//!
//! ```text
//! create_io_queue:  alloc SQ mem ─> alloc CQ mem ─> CREATE_CQ ─> CREATE_SQ
//! destroy_io_queue: DESTROY_SQ ─> DESTROY_CQ ─> free
//! ```
//!
//! デバイス配置 (LLQ) の SQ はディスクリプタをデバイスへプッシュするため、
//! ホスト側には DMA 不要の作業バッファだけを持つ。

use alloc::sync::Arc;
use alloc::vec::Vec;
use log::{debug, error, warn};

use super::admin::AdminQueue;
use super::commands::{
    CreateCqCmd, CreateCqResp, CreateSqCmd, CreateSqResp, DestroyCqCmd, DestroySqCmd, MemAddr,
};
use super::defs::{
    COMPLETION_POLICY_DESC, PlacementPolicy, QUEUE_TYPE_ETH, QueueDirection, RX_CDESC_SIZE,
    RX_DESC_SIZE, TOTAL_NUM_QUEUES, TX_CDESC_SIZE, TX_DESC_SIZE,
};
use super::device::EnaDevice;
use super::error::{EnaError, Result};
use super::ring::RingCursor;
use crate::io::dma::CoherentBuffer;
use crate::io::hal::EnaHal;

/// I/Oキュー作成パラメータ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoQueueParams {
    /// 呼び出し側のキューID (< 256)
    pub qid: u16,
    pub direction: QueueDirection,
    pub placement: PlacementPolicy,
    pub msix_vector: u16,
    /// SQ/CQ の深度（2の冪）
    pub queue_size: u16,
}

impl IoQueueParams {
    pub fn new(qid: u16, direction: QueueDirection, queue_size: u16) -> Self {
        Self {
            qid,
            direction,
            placement: PlacementPolicy::Host,
            msix_vector: 0,
            queue_size,
        }
    }

    pub fn set_placement(&mut self, placement: PlacementPolicy) -> &mut Self {
        self.placement = placement;
        self
    }

    pub fn set_msix_vector(&mut self, vector: u16) -> &mut Self {
        self.msix_vector = vector;
        self
    }

    fn desc_sizes(&self) -> (usize, usize) {
        match self.direction {
            QueueDirection::Tx => (TX_DESC_SIZE, TX_CDESC_SIZE),
            QueueDirection::Rx => (RX_DESC_SIZE, RX_CDESC_SIZE),
        }
    }
}

// ============================================================================
// Submission queue
// ============================================================================

/// SQ ディスクリプタのメモリ
pub enum SqDescMemory<H: EnaHal> {
    /// デバイスが DMA で読む
    Host(CoherentBuffer<H>),
    /// LLQ へプッシュする前の作業領域
    Device(Vec<u8>),
}

impl<H: EnaHal> SqDescMemory<H> {
    pub fn len(&self) -> usize {
        match self {
            SqDescMemory::Host(buf) => buf.len(),
            SqDescMemory::Device(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// デバイス側アドレス（ホスト配置のみ）
    pub fn dma_addr(&self) -> Option<u64> {
        match self {
            SqDescMemory::Host(buf) => Some(buf.dma_addr()),
            SqDescMemory::Device(_) => None,
        }
    }
}

/// I/O サブミッションキュー
pub struct IoSq<H: EnaHal> {
    qid: u16,
    /// デバイスが割り当てたインデックス
    idx: u16,
    direction: QueueDirection,
    placement: PlacementPolicy,
    desc: SqDescMemory<H>,
    desc_entry_size: usize,
    db_offset: u32,
    llq_header_offset: u32,
    llq_desc_offset: u32,
    cursor: RingCursor,
}

impl<H: EnaHal> IoSq<H> {
    fn alloc(hal: &Arc<H>, params: &IoQueueParams, entry_size: usize) -> Result<Self> {
        let size = entry_size
            .checked_mul(params.queue_size as usize)
            .ok_or(EnaError::InvalidArgument)?;

        let desc = match params.placement {
            PlacementPolicy::Host => SqDescMemory::Host(
                CoherentBuffer::new(hal, size).ok_or(EnaError::AllocationFailure)?,
            ),
            PlacementPolicy::Device => {
                let mut v = Vec::new();
                v.try_reserve_exact(size)
                    .map_err(|_| EnaError::AllocationFailure)?;
                v.resize(size, 0u8);
                SqDescMemory::Device(v)
            }
        };

        Ok(Self {
            qid: params.qid,
            idx: 0,
            direction: params.direction,
            placement: params.placement,
            desc,
            desc_entry_size: entry_size,
            db_offset: 0,
            llq_header_offset: 0,
            llq_desc_offset: 0,
            cursor: RingCursor::new(params.queue_size)?,
        })
    }

    pub fn qid(&self) -> u16 {
        self.qid
    }

    pub fn idx(&self) -> u16 {
        self.idx
    }

    pub fn direction(&self) -> QueueDirection {
        self.direction
    }

    pub fn placement(&self) -> PlacementPolicy {
        self.placement
    }

    pub fn depth(&self) -> u16 {
        self.cursor.depth()
    }

    pub fn desc(&self) -> &SqDescMemory<H> {
        &self.desc
    }

    pub fn desc_entry_size(&self) -> usize {
        self.desc_entry_size
    }

    /// ドアベルのレジスタオフセット
    pub fn db_offset(&self) -> u32 {
        self.db_offset
    }

    pub fn llq_header_offset(&self) -> u32 {
        self.llq_header_offset
    }

    pub fn llq_desc_offset(&self) -> u32 {
        self.llq_desc_offset
    }

    pub fn cursor(&self) -> &RingCursor {
        &self.cursor
    }
}

// ============================================================================
// Completion queue
// ============================================================================

/// I/O 完了キュー
pub struct IoCq<H: EnaHal> {
    qid: u16,
    idx: u16,
    direction: QueueDirection,
    cdesc: CoherentBuffer<H>,
    cdesc_entry_size: usize,
    msix_vector: u16,
    db_offset: u32,
    head_db_offset: u32,
    unmask_reg: u32,
    unmask_val: u32,
    moderation_reg: u32,
    cursor: RingCursor,
}

impl<H: EnaHal> IoCq<H> {
    fn alloc(hal: &Arc<H>, params: &IoQueueParams, entry_size: usize) -> Result<Self> {
        let size = entry_size
            .checked_mul(params.queue_size as usize)
            .ok_or(EnaError::InvalidArgument)?;
        let cdesc = CoherentBuffer::new(hal, size).ok_or(EnaError::AllocationFailure)?;

        Ok(Self {
            qid: params.qid,
            idx: 0,
            direction: params.direction,
            cdesc,
            cdesc_entry_size: entry_size,
            msix_vector: params.msix_vector,
            db_offset: 0,
            head_db_offset: 0,
            unmask_reg: 0,
            unmask_val: 0,
            moderation_reg: 0,
            cursor: RingCursor::new(params.queue_size)?,
        })
    }

    pub fn qid(&self) -> u16 {
        self.qid
    }

    pub fn idx(&self) -> u16 {
        self.idx
    }

    pub fn direction(&self) -> QueueDirection {
        self.direction
    }

    pub fn depth(&self) -> u16 {
        self.cursor.depth()
    }

    pub fn dma_addr(&self) -> u64 {
        self.cdesc.dma_addr()
    }

    pub fn cdesc_entry_size(&self) -> usize {
        self.cdesc_entry_size
    }

    pub fn msix_vector(&self) -> u16 {
        self.msix_vector
    }

    pub fn db_offset(&self) -> u32 {
        self.db_offset
    }

    pub fn head_db_offset(&self) -> u32 {
        self.head_db_offset
    }

    /// 割り込み再許可に書くレジスタと値
    pub fn unmask(&self) -> (u32, u32) {
        (self.unmask_reg, self.unmask_val)
    }

    pub fn moderation_reg(&self) -> u32 {
        self.moderation_reg
    }

    pub fn cursor(&self) -> &RingCursor {
        &self.cursor
    }
}

/// キューID 1つ分の SQ/CQ
pub struct IoQueuePair<H: EnaHal> {
    pub sq: IoSq<H>,
    pub cq: IoCq<H>,
}

// ============================================================================
// Admin commands
// ============================================================================

fn create_io_cq<H: EnaHal>(admin: &AdminQueue<H>, cq: &mut IoCq<H>) -> Result<()> {
    let mut cmd = CreateCqCmd {
        msix_vector: cq.msix_vector as u32,
        cq_depth: cq.depth(),
        cq_ba: MemAddr::new(cq.dma_addr()),
        ..Default::default()
    };
    cmd.set_caps(QUEUE_TYPE_ETH, true, cq.cdesc_entry_size);

    let resp: CreateCqResp = admin.execute(&cmd).inspect_err(|e| {
        error!("ENA: failed to create IO CQ: {}", e);
    })?;

    cq.idx = resp.cq_idx;
    cq.db_offset = resp.cq_doorbell_offset;

    if resp.cq_actual_depth != cq.depth() {
        error!(
            "ENA: CQ actual depth {} differs from requested {}",
            resp.cq_actual_depth,
            cq.depth()
        );
        return Err(EnaError::NoSpace);
    }

    cq.head_db_offset = resp.cq_head_db_offset;
    cq.unmask_reg = resp.cq_interrupt_unmask_register;
    cq.unmask_val = resp.cq_interrupt_unmask_value;
    cq.moderation_reg = resp.cq_interrupt_moderation_register;

    debug!("ENA: created cq[{}] depth {}", cq.idx, cq.depth());
    Ok(())
}

fn create_io_sq<H: EnaHal>(admin: &AdminQueue<H>, sq: &mut IoSq<H>, cq_idx: u16) -> Result<()> {
    let mut cmd = CreateSqCmd {
        cq_idx,
        sq_depth: sq.depth(),
        ..Default::default()
    };
    cmd.set_identity(QUEUE_TYPE_ETH, sq.direction as u8)
        .set_policies(sq.placement as u8, COMPLETION_POLICY_DESC)
        .set_physically_contiguous(true);
    if let Some(addr) = sq.desc.dma_addr() {
        cmd.sq_ba = MemAddr::new(addr);
    }

    let resp: CreateSqResp = admin.execute(&cmd).inspect_err(|e| {
        error!("ENA: failed to create IO SQ: {}", e);
    })?;

    sq.idx = resp.sq_idx;
    sq.db_offset = resp.sq_doorbell_offset;

    if resp.sq_actual_depth != sq.depth() {
        error!(
            "ENA: SQ actual depth {} differs from requested {}",
            resp.sq_actual_depth,
            sq.depth()
        );
        return Err(EnaError::NoSpace);
    }

    if sq.placement == PlacementPolicy::Device {
        sq.llq_header_offset = resp.llq_headers_offset;
        sq.llq_desc_offset = resp.llq_descriptors_offset;
    }

    debug!("ENA: created sq[{}] depth {}", sq.idx, sq.depth());
    Ok(())
}

fn destroy_io_sq<H: EnaHal>(admin: &AdminQueue<H>, sq: &IoSq<H>) -> Result<()> {
    let cmd = DestroySqCmd {
        sq_idx: sq.idx,
        sq_identity: ((sq.direction as u8) << 5) & 0xE0,
        reserved: 0,
    };
    admin.execute_no_resp(&cmd).inspect_err(|e| {
        error!("ENA: failed to destroy IO SQ {}: {}", sq.idx, e);
    })
}

fn destroy_io_cq<H: EnaHal>(admin: &AdminQueue<H>, cq: &IoCq<H>) -> Result<()> {
    let cmd = DestroyCqCmd {
        cq_idx: cq.idx,
        reserved1: 0,
    };
    admin.execute_no_resp(&cmd).inspect_err(|e| {
        error!("ENA: failed to destroy IO CQ {}: {}", cq.idx, e);
    })
}

/// 作成途中の失敗で後始末する。失敗はログだけ残して続ける
fn rollback_io_sq<H: EnaHal>(admin: &AdminQueue<H>, sq: &IoSq<H>) {
    if let Err(e) = destroy_io_sq(admin, sq) {
        warn!("ENA: rollback of IO SQ {} failed: {}", sq.idx, e);
    }
}

fn rollback_io_cq<H: EnaHal>(admin: &AdminQueue<H>, cq: &IoCq<H>) {
    if let Err(e) = destroy_io_cq(admin, cq) {
        warn!("ENA: rollback of IO CQ {} failed: {}", cq.idx, e);
    }
}

// ============================================================================
// EnaDevice operations
// ============================================================================

impl<H: EnaHal> EnaDevice<H> {
    /// SQ/CQ を確保してデバイスに作成させる
    ///
    /// 失敗時はホスト側のメモリをすべて解放し、デバイス側に作成済みの SQ/CQ も破棄する。
    pub fn create_io_queue(&mut self, params: &IoQueueParams) -> Result<()> {
        if params.qid >= TOTAL_NUM_QUEUES {
            error!(
                "ENA: qid {} is bigger than the max {}",
                params.qid, TOTAL_NUM_QUEUES
            );
            return Err(EnaError::InvalidQueueId);
        }
        if self.io_queues.contains_key(&params.qid) {
            error!("ENA: qid {} is already in use", params.qid);
            return Err(EnaError::InvalidQueueId);
        }
        if !params.queue_size.is_power_of_two() {
            error!("ENA: invalid IO queue size {}", params.queue_size);
            return Err(EnaError::InvalidArgument);
        }

        let (sq_entry, cq_entry) = params.desc_sizes();
        let mut sq = IoSq::alloc(&self.hal, params, sq_entry)?;
        let mut cq = IoCq::alloc(&self.hal, params, cq_entry)?;

        let admin = self.admin_queue()?;
        if let Err(e) = create_io_cq(admin, &mut cq) {
            // 深度不一致ならデバイス側には CQ が作られている
            if e == EnaError::NoSpace {
                rollback_io_cq(admin, &cq);
            }
            return Err(e);
        }
        if let Err(e) = create_io_sq(admin, &mut sq, cq.idx) {
            if e == EnaError::NoSpace {
                rollback_io_sq(admin, &sq);
            }
            rollback_io_cq(admin, &cq);
            return Err(e);
        }

        self.io_queues.insert(params.qid, IoQueuePair { sq, cq });
        Ok(())
    }

    /// SQ、CQ の順に破棄を依頼し、結果にかかわらずメモリを解放する
    ///
    /// 最初に失敗したコマンドのエラーを返す。
    pub fn destroy_io_queue(&mut self, qid: u16) -> Result<()> {
        if qid >= TOTAL_NUM_QUEUES {
            error!("ENA: qid {} is bigger than the max {}", qid, TOTAL_NUM_QUEUES);
            return Err(EnaError::InvalidQueueId);
        }
        let pair = self
            .io_queues
            .remove(&qid)
            .ok_or(EnaError::InvalidQueueId)?;

        let admin = self.admin_queue()?;
        let sq_result = destroy_io_sq(admin, &pair.sq);
        let cq_result = destroy_io_cq(admin, &pair.cq);
        sq_result.and(cq_result)
    }

    /// キューIDに対応する SQ/CQ
    pub fn get_io_handlers(&self, qid: u16) -> Result<(&IoSq<H>, &IoCq<H>)> {
        if qid >= TOTAL_NUM_QUEUES {
            error!("ENA: invalid queue number {}, the max is {}", qid, TOTAL_NUM_QUEUES);
            return Err(EnaError::InvalidArgument);
        }
        self.io_queues
            .get(&qid)
            .map(|pair| (&pair.sq, &pair.cq))
            .ok_or(EnaError::InvalidQueueId)
    }

    pub fn io_queue_count(&self) -> usize {
        self.io_queues.len()
    }
}
