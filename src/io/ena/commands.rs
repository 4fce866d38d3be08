// ============================================================================
// src/io/ena/commands.rs - ENA Admin Descriptors
// ============================================================================
//!
//! # 管理キューのディスクリプタ
//!
//! AQ/ACQ/AENQ のエントリ (各64バイト) と、各コマンドのペイロード構造体。
//! すべてデバイスが期待するバイトレイアウトに一致する `#[repr(C)]`。
//!
//! ```text
//! AqEntry  : | cmd_id:u16 | opcode:u8 | flags:u8 | payload: 15 x u32 |
//! AcqEntry : | cmd_id:u16 | status:u8 | flags:u8 | ext_status:u16 | sq_head:u16 | payload: 14 x u32 |
//! AenqEntry: | group:u16 | syndrom:u16 | flags:u8 | rsvd:3 | ts_lo:u32 | ts_hi:u32 | data: 12 x u32 |
//! ```

use bitflags::bitflags;
use core::mem::{offset_of, size_of};
use core::ptr;
use log::error;
use static_assertions::const_assert_eq;

use super::defs::{AdminOpcode, CMD_ID_MASK, MAX_DMA_ADDR_BITS};
use crate::io::dma::DeviceRepr;

// ============================================================================
// Common pieces
// ============================================================================

/// 48bit DMAアドレス
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemAddr {
    pub low: u32,
    pub high: u16,
    pub reserved: u16,
}

impl MemAddr {
    /// アドレスを設定（48bitを超える部分は切り捨て、エラーログ）
    pub fn new(addr: u64) -> Self {
        if addr >> MAX_DMA_ADDR_BITS != 0 {
            error!("ENA: DMA address {:#x} exceeds {} bits", addr, MAX_DMA_ADDR_BITS);
        }
        Self {
            low: addr as u32,
            high: ((addr >> 32) & 0xFFFF) as u16,
            reserved: 0,
        }
    }

    pub fn addr(&self) -> u64 {
        ((self.high as u64) << 32) | self.low as u64
    }
}

/// 帯域外コントロールバッファの指定
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CtrlBuffInfo {
    pub length: u32,
    pub address: MemAddr,
}

bitflags! {
    /// AQ 共通ディスクリプタの flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AqFlags: u8 {
        const PHASE = 1 << 0;
        const CTRL_DATA = 1 << 1;
        const CTRL_DATA_INDIRECT = 1 << 2;
    }
}

/// 完了・イベントエントリの phase ビット
pub const PHASE_MASK: u8 = 1 << 0;

// ============================================================================
// Submission entry
// ============================================================================

/// AQ 共通ディスクリプタ
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AqCommonDesc {
    /// 12:0 command_id
    pub command_id: u16,
    pub opcode: u8,
    pub flags: u8,
}

/// 管理サブミッションキューのエントリ
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AqEntry {
    pub common: AqCommonDesc,
    /// ワード1以降（インライン、または ワード1-3 がコントロールバッファ）
    pub payload: [u32; 15],
}

impl AqEntry {
    /// ペイロードなしのエントリ
    pub fn new(opcode: AdminOpcode) -> Self {
        let mut entry = Self::default();
        entry.common.opcode = opcode as u8;
        entry
    }

    /// コマンド構造体からエントリを組み立てる
    pub fn from_command<C: AdminCommand>(cmd: &C) -> Self {
        let mut entry = Self::new(C::OPCODE);
        // SAFETY: size_of::<C>() <= payload の大きさ（AdminCommand の const で検査）。
        // C は DeviceRepr なのでバイト列として読める
        unsafe {
            let () = C::FITS;
            ptr::copy_nonoverlapping(
                cmd as *const C as *const u8,
                entry.payload.as_mut_ptr() as *mut u8,
                size_of::<C>(),
            );
        }
        entry
    }

    pub fn command_id(&self) -> u16 {
        self.common.command_id & CMD_ID_MASK
    }

    pub fn opcode(&self) -> u8 {
        self.common.opcode
    }

    pub fn flags(&self) -> AqFlags {
        AqFlags::from_bits_truncate(self.common.flags)
    }

    pub fn phase(&self) -> bool {
        self.flags().contains(AqFlags::PHASE)
    }

    /// コマンドIDと phase を刻印
    pub(crate) fn stamp(&mut self, command_id: u16, phase: bool) {
        self.common.command_id = command_id & CMD_ID_MASK;
        let mut flags = self.flags().difference(AqFlags::PHASE);
        flags.set(AqFlags::PHASE, phase);
        self.common.flags = flags.bits();
    }

    /// ペイロードを `C` として解釈
    pub fn command<C: AdminCommand>(&self) -> C {
        let () = C::FITS;
        // SAFETY: サイズは FITS で検査済み、C は任意のビット列を許す
        unsafe { ptr::read_unaligned(self.payload.as_ptr() as *const C) }
    }

    /// 先頭 `len` バイトだけを残し、残りをゼロにする
    pub(crate) fn truncated(&self, len: usize) -> Self {
        let mut out = Self::default();
        let len = len.min(size_of::<Self>());
        // SAFETY: 両者とも 64 バイトの平坦な構造体、len <= 64
        unsafe {
            ptr::copy_nonoverlapping(
                self as *const Self as *const u8,
                &mut out as *mut Self as *mut u8,
                len,
            );
        }
        out
    }
}

// ============================================================================
// Completion entry
// ============================================================================

/// ACQ 共通ディスクリプタ
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcqCommonDesc {
    /// 12:0 command_id
    pub command: u16,
    pub status: u8,
    /// 0 : phase
    pub flags: u8,
    pub extended_status: u16,
    /// 対応するSQのhead（デバイスが報告）
    pub sq_head_indx: u16,
}

/// 管理完了キューのエントリ
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcqEntry {
    pub common: AcqCommonDesc,
    pub payload: [u32; 14],
}

impl AcqEntry {
    /// flags バイトのエントリ内オフセット
    pub const FLAGS_OFFSET: usize = offset_of!(AcqCommonDesc, flags);

    pub fn command_id(&self) -> u16 {
        self.common.command & CMD_ID_MASK
    }

    pub fn status(&self) -> u8 {
        self.common.status
    }

    pub fn phase(&self) -> bool {
        self.common.flags & PHASE_MASK != 0
    }

    /// 応答ペイロードを `R` として解釈
    pub fn response<R: AdminResponse>(&self) -> R {
        let () = R::FITS;
        // SAFETY: サイズは FITS で検査済み、R は任意のビット列を許す
        unsafe { ptr::read_unaligned(self.payload.as_ptr() as *const R) }
    }

    /// 応答ペイロードに `R` を書く（デバイス側・テスト用）
    pub fn with_response<R: AdminResponse>(mut self, resp: &R) -> Self {
        let () = R::FITS;
        // SAFETY: サイズは FITS で検査済み
        unsafe {
            ptr::copy_nonoverlapping(
                resp as *const R as *const u8,
                self.payload.as_mut_ptr() as *mut u8,
                size_of::<R>(),
            );
        }
        self
    }

    /// 先頭 `len` バイトを `out` にコピー
    pub(crate) fn copy_prefix_to(&self, out: &mut AcqEntry, len: usize) {
        let len = len.min(size_of::<Self>());
        // SAFETY: 両者とも 64 バイトの平坦な構造体、len <= 64
        unsafe {
            ptr::copy_nonoverlapping(
                self as *const Self as *const u8,
                out as *mut Self as *mut u8,
                len,
            );
        }
    }
}

// ============================================================================
// Async event entry
// ============================================================================

/// AENQ 共通ディスクリプタ
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AenqCommonDesc {
    pub group: u16,
    pub syndrom: u16,
    /// 0 : phase
    pub flags: u8,
    pub reserved1: [u8; 3],
    pub timestamp_low: u32,
    pub timestamp_high: u32,
}

/// 非同期イベント通知キューのエントリ
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AenqEntry {
    pub common: AenqCommonDesc,
    pub data: [u32; 12],
}

impl AenqEntry {
    pub const FLAGS_OFFSET: usize = offset_of!(AenqCommonDesc, flags);

    pub fn group(&self) -> u16 {
        self.common.group
    }

    pub fn syndrom(&self) -> u16 {
        self.common.syndrom
    }

    pub fn phase(&self) -> bool {
        self.common.flags & PHASE_MASK != 0
    }

    pub fn timestamp(&self) -> u64 {
        ((self.common.timestamp_high as u64) << 32) | self.common.timestamp_low as u64
    }

    /// LinkChange イベント: bit0 がリンク状態
    pub fn link_up(&self) -> bool {
        self.data[0] & 0x1 != 0
    }
}

// ============================================================================
// Readless MMIO response
// ============================================================================

/// readless レジスタ読み出しの応答バッファ
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MmioReadLessResp {
    pub req_id: u16,
    pub reg_off: u16,
    pub reg_val: u32,
}

impl MmioReadLessResp {
    pub const REQ_ID_OFFSET: usize = offset_of!(MmioReadLessResp, req_id);
    pub const REG_OFF_OFFSET: usize = offset_of!(MmioReadLessResp, reg_off);
    pub const REG_VAL_OFFSET: usize = offset_of!(MmioReadLessResp, reg_val);
}

// ============================================================================
// Command / response payload traits
// ============================================================================

/// AQエントリのワード1以降に載るコマンド
pub trait AdminCommand: DeviceRepr {
    const OPCODE: AdminOpcode;
    #[doc(hidden)]
    const FITS: () = assert!(size_of::<Self>() <= size_of::<[u32; 15]>());
}

/// ACQエントリのワード2以降に載る応答
pub trait AdminResponse: DeviceRepr {
    #[doc(hidden)]
    const FITS: () = assert!(size_of::<Self>() <= size_of::<[u32; 14]>());
}

// ============================================================================
// Queue commands
// ============================================================================

/// Create SQ
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateSqCmd {
    /// 4:0 sq_type, 7:5 sq_direction
    pub sq_identity: u8,
    pub sq_caps_1: u8,
    /// 3:0 placement_policy, 6:4 completion_policy
    pub sq_caps_2: u8,
    /// 0 : is_physically_contiguous
    pub sq_caps_3: u8,
    pub cq_idx: u16,
    pub sq_depth: u16,
    pub sq_ba: MemAddr,
    pub sq_head_writeback: MemAddr,
    pub pd: u16,
    pub reserved16_w8: u16,
    pub reserved0_w9: u32,
}

impl CreateSqCmd {
    pub fn set_identity(&mut self, sq_type: u8, direction: u8) -> &mut Self {
        self.sq_identity = (sq_type & 0x1F) | ((direction << 5) & 0xE0);
        self
    }

    pub fn set_policies(&mut self, placement: u8, completion: u8) -> &mut Self {
        self.sq_caps_2 = (placement & 0x0F) | ((completion << 4) & 0x70);
        self
    }

    pub fn set_physically_contiguous(&mut self, contiguous: bool) -> &mut Self {
        self.sq_caps_3 = (self.sq_caps_3 & !0x1) | contiguous as u8;
        self
    }

    pub fn direction(&self) -> u8 {
        (self.sq_identity & 0xE0) >> 5
    }

    pub fn placement_policy(&self) -> u8 {
        self.sq_caps_2 & 0x0F
    }

    pub fn completion_policy(&self) -> u8 {
        (self.sq_caps_2 & 0x70) >> 4
    }
}

/// Create SQ 応答
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateSqResp {
    pub sq_idx: u16,
    pub sq_actual_depth: u16,
    pub sq_doorbell_offset: u32,
    pub llq_descriptors_offset: u32,
    pub llq_headers_offset: u32,
}

/// Destroy SQ
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestroySqCmd {
    pub sq_idx: u16,
    /// 7:5 sq_direction
    pub sq_identity: u8,
    pub reserved: u8,
}

/// Create CQ
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateCqCmd {
    /// 4:0 cq_type, 5 interrupt_mode_enabled
    pub cq_caps_1: u8,
    /// 4:0 cq_entry_size_words
    pub cq_caps_2: u8,
    pub cq_depth: u16,
    pub msix_vector: u32,
    pub cq_ba: MemAddr,
}

impl CreateCqCmd {
    pub fn set_caps(&mut self, cq_type: u8, interrupt_mode: bool, entry_size: usize) -> &mut Self {
        self.cq_caps_1 = (cq_type & 0x1F) | ((interrupt_mode as u8) << 5);
        self.cq_caps_2 = ((entry_size / 4) as u8) & 0x1F;
        self
    }

    pub fn interrupt_mode(&self) -> bool {
        self.cq_caps_1 & 0x20 != 0
    }

    pub fn entry_size_words(&self) -> u8 {
        self.cq_caps_2 & 0x1F
    }
}

/// Create CQ 応答
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateCqResp {
    pub cq_idx: u16,
    pub cq_actual_depth: u16,
    pub cq_doorbell_offset: u32,
    pub cq_head_db_offset: u32,
    pub cq_interrupt_unmask_register: u32,
    pub cq_interrupt_unmask_value: u32,
    pub cq_interrupt_moderation_register: u32,
}

/// Destroy CQ
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestroyCqCmd {
    pub cq_idx: u16,
    pub reserved1: u16,
}

impl AdminCommand for CreateSqCmd {
    const OPCODE: AdminOpcode = AdminOpcode::CreateSq;
}
impl AdminCommand for DestroySqCmd {
    const OPCODE: AdminOpcode = AdminOpcode::DestroySq;
}
impl AdminCommand for CreateCqCmd {
    const OPCODE: AdminOpcode = AdminOpcode::CreateCq;
}
impl AdminCommand for DestroyCqCmd {
    const OPCODE: AdminOpcode = AdminOpcode::DestroyCq;
}
impl AdminResponse for CreateSqResp {}
impl AdminResponse for CreateCqResp {}

// ============================================================================
// Feature commands
// ============================================================================

/// Get/Set Feature 共通部
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureCommon {
    pub flags: u8,
    pub feature_id: u8,
    pub reserved16: u16,
}

/// Get Feature
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetFeatCmd {
    /// ワード1-3
    pub control_buffer: CtrlBuffInfo,
    pub feat_common: FeatureCommon,
    pub raw: [u32; 11],
}

/// Set Feature
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetFeatCmd {
    pub control_buffer: CtrlBuffInfo,
    pub feat_common: FeatureCommon,
    pub raw: [u32; 11],
}

impl SetFeatCmd {
    /// 機能固有データとして `D` を書く
    pub fn set_desc<D: DeviceRepr>(&mut self, desc: &D) -> &mut Self {
        assert!(size_of::<D>() <= size_of::<[u32; 11]>());
        // SAFETY: サイズ検査済み、D は平坦な構造体
        unsafe {
            ptr::copy_nonoverlapping(
                desc as *const D as *const u8,
                self.raw.as_mut_ptr() as *mut u8,
                size_of::<D>(),
            );
        }
        self
    }

    /// 機能固有データを `D` として読む
    pub fn desc<D: DeviceRepr>(&self) -> D {
        assert!(size_of::<D>() <= size_of::<[u32; 11]>());
        // SAFETY: サイズ検査済み、D は任意のビット列を許す
        unsafe { ptr::read_unaligned(self.raw.as_ptr() as *const D) }
    }
}

/// Get Feature 応答
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetFeatResp {
    pub raw: [u32; 14],
}

impl GetFeatResp {
    /// 応答データを `D` として読む
    pub fn desc<D: DeviceRepr>(&self) -> D {
        assert!(size_of::<D>() <= size_of::<[u32; 14]>());
        // SAFETY: サイズ検査済み、D は任意のビット列を許す
        unsafe { ptr::read_unaligned(self.raw.as_ptr() as *const D) }
    }

    /// `D` から応答を作る（デバイス側・テスト用）
    pub fn from_desc<D: DeviceRepr>(desc: &D) -> Self {
        assert!(size_of::<D>() <= size_of::<[u32; 14]>());
        let mut resp = Self::default();
        // SAFETY: サイズ検査済み
        unsafe {
            ptr::copy_nonoverlapping(
                desc as *const D as *const u8,
                resp.raw.as_mut_ptr() as *mut u8,
                size_of::<D>(),
            );
        }
        resp
    }
}

impl AdminCommand for GetFeatCmd {
    const OPCODE: AdminOpcode = AdminOpcode::GetFeature;
}
impl AdminCommand for SetFeatCmd {
    const OPCODE: AdminOpcode = AdminOpcode::SetFeature;
}
impl AdminResponse for GetFeatResp {}

/// デバイス属性
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceAttrFeatureDesc {
    pub impl_id: u32,
    pub device_version: u32,
    /// Get/Set 可能な機能IDのビットマップ
    pub supported_features: u32,
    pub reserved3: u32,
    pub phys_addr_width: u32,
    pub virt_addr_width: u32,
    /// ネットワークバイトオーダー
    pub mac_addr: [u8; 6],
    pub reserved7: [u8; 2],
    pub max_mtu: u32,
}

/// キュー数・深度の上限
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFeatureDesc {
    pub max_sq_num: u32,
    pub max_sq_depth: u32,
    pub max_cq_num: u32,
    pub max_cq_depth: u32,
    pub max_llq_num: u32,
    pub max_llq_depth: u32,
    pub max_llq_header_size: u32,
}

/// AENQ グループ設定
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AenqFeatureDesc {
    pub supported_groups: u32,
    pub enabled_groups: u32,
}

/// リンク情報
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkFeatureDesc {
    /// Mbps
    pub speed: u32,
    pub supported: u32,
    /// 0 : autoneg, 1 : duplex
    pub flags: u32,
}

impl LinkFeatureDesc {
    pub fn autoneg(&self) -> bool {
        self.flags & 0x1 != 0
    }

    pub fn full_duplex(&self) -> bool {
        self.flags & 0x2 != 0
    }
}

/// ステートレスオフロード
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OffloadFeatureDesc {
    pub tx: u32,
    pub rx_supported: u32,
    pub rx_enabled: u32,
}

/// MTU 設定
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MtuFeatureDesc {
    pub mtu: u32,
}

/// 割り込みモデレーション設定
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntrModerFeatureDesc {
    pub cq_idx: u16,
    /// 3:0 sq_direction
    pub queue_identity: u8,
    pub reserved1: u8,
    /// 0 : enable
    pub flags: u32,
    pub count: u16,
    pub interval: u16,
}

unsafe impl DeviceRepr for DeviceAttrFeatureDesc {}
unsafe impl DeviceRepr for QueueFeatureDesc {}
unsafe impl DeviceRepr for AenqFeatureDesc {}
unsafe impl DeviceRepr for LinkFeatureDesc {}
unsafe impl DeviceRepr for OffloadFeatureDesc {}
unsafe impl DeviceRepr for MtuFeatureDesc {}
unsafe impl DeviceRepr for IntrModerFeatureDesc {}

// ============================================================================
// Statistics
// ============================================================================

/// Get Stats
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetStatsCmd {
    /// ワード1-3（拡張統計ではテキストの出力先）
    pub control_buffer: CtrlBuffInfo,
    pub stats_type: u8,
    pub scope: u8,
    pub reserved3: u16,
    pub queue_idx: u16,
    /// 統計対象の PCI function
    pub device_id: u16,
}

/// 基本統計（各カウンタは low/high の 64bit）
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicStats {
    pub tx_bytes_low: u32,
    pub tx_bytes_high: u32,
    pub tx_pkts_low: u32,
    pub tx_pkts_high: u32,
    pub rx_bytes_low: u32,
    pub rx_bytes_high: u32,
    pub rx_pkts_low: u32,
    pub rx_pkts_high: u32,
    pub rx_drops_low: u32,
    pub rx_drops_high: u32,
}

impl BasicStats {
    fn join(low: u32, high: u32) -> u64 {
        ((high as u64) << 32) | low as u64
    }

    pub fn tx_bytes(&self) -> u64 {
        Self::join(self.tx_bytes_low, self.tx_bytes_high)
    }

    pub fn tx_pkts(&self) -> u64 {
        Self::join(self.tx_pkts_low, self.tx_pkts_high)
    }

    pub fn rx_bytes(&self) -> u64 {
        Self::join(self.rx_bytes_low, self.rx_bytes_high)
    }

    pub fn rx_pkts(&self) -> u64 {
        Self::join(self.rx_pkts_low, self.rx_pkts_high)
    }

    pub fn rx_drops(&self) -> u64 {
        Self::join(self.rx_drops_low, self.rx_drops_high)
    }
}

impl AdminCommand for GetStatsCmd {
    const OPCODE: AdminOpcode = AdminOpcode::GetStats;
}
impl AdminResponse for BasicStats {}

// ============================================================================
// Device representation
// ============================================================================

unsafe impl DeviceRepr for MemAddr {}
unsafe impl DeviceRepr for CtrlBuffInfo {}
unsafe impl DeviceRepr for AqEntry {}
unsafe impl DeviceRepr for AcqEntry {}
unsafe impl DeviceRepr for AenqEntry {}
unsafe impl DeviceRepr for MmioReadLessResp {}
unsafe impl DeviceRepr for CreateSqCmd {}
unsafe impl DeviceRepr for CreateSqResp {}
unsafe impl DeviceRepr for DestroySqCmd {}
unsafe impl DeviceRepr for CreateCqCmd {}
unsafe impl DeviceRepr for CreateCqResp {}
unsafe impl DeviceRepr for DestroyCqCmd {}
unsafe impl DeviceRepr for FeatureCommon {}
unsafe impl DeviceRepr for GetFeatCmd {}
unsafe impl DeviceRepr for SetFeatCmd {}
unsafe impl DeviceRepr for GetFeatResp {}
unsafe impl DeviceRepr for GetStatsCmd {}
unsafe impl DeviceRepr for BasicStats {}

// ============================================================================
// Layout
// ============================================================================

const_assert_eq!(size_of::<MemAddr>(), 8);
const_assert_eq!(size_of::<CtrlBuffInfo>(), 12);
const_assert_eq!(size_of::<AqEntry>(), 64);
const_assert_eq!(size_of::<AcqEntry>(), 64);
const_assert_eq!(size_of::<AenqEntry>(), 64);
const_assert_eq!(size_of::<MmioReadLessResp>(), 8);
const_assert_eq!(size_of::<CreateSqCmd>(), 32);
const_assert_eq!(size_of::<CreateSqResp>(), 16);
const_assert_eq!(size_of::<DestroySqCmd>(), 4);
const_assert_eq!(size_of::<CreateCqCmd>(), 16);
const_assert_eq!(size_of::<CreateCqResp>(), 24);
const_assert_eq!(size_of::<DestroyCqCmd>(), 4);
const_assert_eq!(size_of::<GetFeatCmd>(), 60);
const_assert_eq!(size_of::<SetFeatCmd>(), 60);
const_assert_eq!(size_of::<GetFeatResp>(), 56);
const_assert_eq!(size_of::<DeviceAttrFeatureDesc>(), 36);
const_assert_eq!(size_of::<IntrModerFeatureDesc>(), 12);
const_assert_eq!(size_of::<GetStatsCmd>(), 20);
const_assert_eq!(size_of::<BasicStats>(), 40);
const_assert_eq!(AcqEntry::FLAGS_OFFSET, 3);
const_assert_eq!(AenqEntry::FLAGS_OFFSET, 4);
