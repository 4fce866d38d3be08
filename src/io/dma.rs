// ============================================================================
// src/io/dma.rs - Coherent DMA Regions
// ============================================================================
//!
//! # コヒーレントDMA領域
//!
//! デバイスと共有するリング・応答バッファのメモリ。
//!
//! ## 所有モデル
//! ```text
//! DmaAllocator::alloc_coherent ──> DmaRegion ──> CoherentBuffer (Drop で解放)
//!                                                    │
//!                                                    └──> DmaRing<T> (型付きスロット)
//! ```
//!
//! 領域の内容はデバイスが非同期に書き換えるため、アクセスはすべて
//! volatile で行う。参照 (`&T`) は決して作らない。

use alloc::sync::Arc;
use core::marker::PhantomData;
use core::mem::{ManuallyDrop, align_of, size_of};
use core::ops::Deref;
use core::ptr::{self, NonNull};

// ============================================================================
// Device representation marker
// ============================================================================

/// デバイスと共有できる平坦なデータ型
///
/// # Safety
/// 実装型は `#[repr(C)]` または整数型で、任意のビットパターンが有効値であり、
/// パディングを含まないこと。
pub unsafe trait DeviceRepr: Copy + 'static {}

unsafe impl DeviceRepr for u8 {}
unsafe impl DeviceRepr for u16 {}
unsafe impl DeviceRepr for u32 {}
unsafe impl DeviceRepr for u64 {}
unsafe impl<T: DeviceRepr, const N: usize> DeviceRepr for [T; N] {}

// ============================================================================
// DmaRegion
// ============================================================================

/// アロケータが返す生のコヒーレント領域
pub struct DmaRegion {
    /// CPU側アドレス
    virt: NonNull<u8>,
    /// デバイス側（バス）アドレス
    dma_addr: u64,
    /// バイト長
    len: usize,
}

// SAFETY: DmaRegion は所有権を1つだけ持つメモリ片であり、内部への
// アクセスはすべて volatile 操作で行うため、スレッド間で共有してよい
unsafe impl Send for DmaRegion {}
unsafe impl Sync for DmaRegion {}

impl DmaRegion {
    /// 生の領域から構築
    ///
    /// # Safety
    /// - `virt` から `len` バイトが有効で、この値の寿命の間は他から解放されない
    /// - `dma_addr` はデバイスから同じメモリを指すアドレス
    pub unsafe fn from_raw_parts(virt: NonNull<u8>, dma_addr: u64, len: usize) -> Self {
        Self { virt, dma_addr, len }
    }

    /// デバイス側アドレス
    pub fn dma_addr(&self) -> u64 {
        self.dma_addr
    }

    /// CPU側先頭アドレス
    pub fn as_ptr(&self) -> *mut u8 {
        self.virt.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn slot<T: DeviceRepr>(&self, offset: usize) -> *mut T {
        let end = offset.checked_add(size_of::<T>());
        assert!(
            end.is_some_and(|end| end <= self.len),
            "DMA access out of bounds: offset={:#x} len={:#x}",
            offset,
            self.len
        );
        // SAFETY: 範囲は直前に検査済み
        let p = unsafe { self.virt.as_ptr().add(offset) };
        assert!(p as usize % align_of::<T>() == 0, "misaligned DMA access");
        p as *mut T
    }

    /// `offset` から `T` を読む
    pub fn read<T: DeviceRepr>(&self, offset: usize) -> T {
        // SAFETY: 範囲とアライメントは slot() で検査済み。DeviceRepr は任意のビット列を許す
        unsafe { ptr::read_volatile(self.slot::<T>(offset)) }
    }

    /// `offset` へ `T` を書く
    pub fn write<T: DeviceRepr>(&self, offset: usize, value: T) {
        // SAFETY: 範囲とアライメントは slot() で検査済み
        unsafe { ptr::write_volatile(self.slot::<T>(offset), value) }
    }

    /// 領域全体をゼロクリア
    pub fn zero(&self) {
        for i in 0..self.len {
            // SAFETY: i < len
            unsafe { ptr::write_volatile(self.virt.as_ptr().add(i), 0u8) };
        }
    }

    /// `offset` から `out.len()` バイトをコピー
    pub fn copy_out(&self, offset: usize, out: &mut [u8]) {
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = self.read::<u8>(offset + i);
        }
    }
}

// ============================================================================
// Allocator
// ============================================================================

/// コヒーレントDMAメモリのアロケータ
pub trait DmaAllocator: Send + Sync {
    /// `size` バイト以上の領域を確保（失敗時 None）
    fn alloc_coherent(&self, size: usize) -> Option<DmaRegion>;

    /// `alloc_coherent` で得た領域を返却
    fn free_coherent(&self, region: DmaRegion);
}

// ============================================================================
// CoherentBuffer
// ============================================================================

/// Drop 時にアロケータへ返却される領域
pub struct CoherentBuffer<A: DmaAllocator + ?Sized> {
    region: ManuallyDrop<DmaRegion>,
    allocator: Arc<A>,
}

impl<A: DmaAllocator + ?Sized> CoherentBuffer<A> {
    /// ゼロクリア済みの領域を確保
    pub fn new(allocator: &Arc<A>, size: usize) -> Option<Self> {
        let region = allocator.alloc_coherent(size)?;
        if region.len() < size {
            allocator.free_coherent(region);
            return None;
        }
        region.zero();
        Some(Self {
            region: ManuallyDrop::new(region),
            allocator: Arc::clone(allocator),
        })
    }
}

impl<A: DmaAllocator + ?Sized> Deref for CoherentBuffer<A> {
    type Target = DmaRegion;

    fn deref(&self) -> &DmaRegion {
        &self.region
    }
}

impl<A: DmaAllocator + ?Sized> Drop for CoherentBuffer<A> {
    fn drop(&mut self) {
        // SAFETY: region はここで一度だけ取り出され、以後触れない
        let region = unsafe { ManuallyDrop::take(&mut self.region) };
        self.allocator.free_coherent(region);
    }
}

// ============================================================================
// DmaRing
// ============================================================================

/// 固定長エントリのリング領域
pub struct DmaRing<A: DmaAllocator + ?Sized, T: DeviceRepr> {
    buf: CoherentBuffer<A>,
    depth: u16,
    _entry: PhantomData<T>,
}

impl<A: DmaAllocator + ?Sized, T: DeviceRepr> DmaRing<A, T> {
    /// `depth` エントリ分を確保
    pub fn new(allocator: &Arc<A>, depth: u16) -> Option<Self> {
        let size = size_of::<T>().checked_mul(depth as usize)?;
        let buf = CoherentBuffer::new(allocator, size)?;
        Some(Self {
            buf,
            depth,
            _entry: PhantomData,
        })
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    pub fn dma_addr(&self) -> u64 {
        self.buf.dma_addr()
    }

    pub const fn entry_size() -> usize {
        size_of::<T>()
    }

    /// スロット `idx` のエントリ全体を読む
    pub fn read(&self, idx: usize) -> T {
        self.buf.read(idx * size_of::<T>())
    }

    /// スロット `idx` へエントリ全体を書く
    pub fn write(&self, idx: usize, entry: T) {
        self.buf.write(idx * size_of::<T>(), entry);
    }

    /// スロット `idx` の先頭から `field_offset` にあるフィールドだけを読む
    pub fn read_field<F: DeviceRepr>(&self, idx: usize, field_offset: usize) -> F {
        debug_assert!(field_offset + size_of::<F>() <= size_of::<T>());
        self.buf.read(idx * size_of::<T>() + field_offset)
    }

    /// 下位領域
    pub fn region(&self) -> &DmaRegion {
        &self.buf
    }
}

// ============================================================================
// Tests
// ============================================================================
