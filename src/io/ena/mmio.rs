// ============================================================================
// src/io/ena/mmio.rs - Readless MMIO Register Reads
// ============================================================================
//!
//! # readless レジスタ読み出し
//!
//! 仮想化環境ではBARの直接読み出しが高コストなため、ENAは読み出しを
//! 「要求の書き込み + DMA応答のポーリング」で行う。
//!
//! ```text
//! host                              device
//!  | resp.req_id = seq + 0xDEAD      |
//!  | MMIO_REG_READ = off<<16 | seq ->|
//!  |                                 | resp = {seq, off, value}  (DMA)
//!  | poll resp.req_id == seq         |
//! ```
//!
//! 同時に1件しか発行できないため、要求ID (seq) をロックで保護する。

use alloc::sync::Arc;
use core::mem::size_of;
use core::sync::atomic::{Ordering, fence};
use log::{error, warn};
use spin::Mutex;

use super::commands::MmioReadLessResp;
use super::config::AdminConfig;
use super::defs::MMIO_READ_TIMEOUT;
use super::error::{EnaError, Result};
use super::regs::{mmio_read_request, offsets};
use crate::io::dma::CoherentBuffer;
use crate::io::hal::EnaHal;

/// 要求IDの毒値オフセット
const REQ_ID_POISON: u16 = 0xDEAD;

/// readless 読み出しエンジン
pub struct MmioReader<H: EnaHal> {
    hal: Arc<H>,
    /// デバイスが応答を書き込むバッファ
    resp: CoherentBuffer<H>,
    /// 最後に発行した要求ID
    seq: Mutex<u16>,
    timeout_iters: u32,
    delay_us: u32,
}

impl<H: EnaHal> MmioReader<H> {
    /// 応答バッファを確保し、そのアドレスをデバイスに登録
    pub fn new(hal: Arc<H>, config: &AdminConfig) -> Result<Self> {
        let resp = CoherentBuffer::new(&hal, size_of::<MmioReadLessResp>())
            .ok_or(EnaError::AllocationFailure)?;
        let reader = Self {
            hal,
            resp,
            seq: Mutex::new(0),
            timeout_iters: config.reg_read_timeout_iters,
            delay_us: config.reg_read_delay_us,
        };
        reader.write_dev_addr();
        reader.resp.write::<u16>(MmioReadLessResp::REQ_ID_OFFSET, 0);
        Ok(reader)
    }

    /// 応答バッファのアドレスを（再）登録する。リセット後に必要
    pub fn write_dev_addr(&self) {
        let addr = self.resp.dma_addr();
        self.hal.write32(offsets::MMIO_RESP_LO, addr as u32);
        self.hal.write32(offsets::MMIO_RESP_HI, (addr >> 32) as u32);
    }

    /// 応答バッファのデバイス側アドレス
    pub fn resp_dma_addr(&self) -> u64 {
        self.resp.dma_addr()
    }

    /// レジスタを読む
    ///
    /// 応答が来ない場合、またはオフセットがレジスタ空間外の場合は
    /// `0xFFFF_FFFF` を返す。
    pub fn read32(&self, offset: u32) -> u32 {
        if offset % 4 != 0 || offset > offsets::REGS_WINDOW_SIZE - 4 {
            error!("ENA: register read with invalid offset {:#x}", offset);
            return MMIO_READ_TIMEOUT;
        }

        let mut seq = self.seq.lock();
        *seq = seq.wrapping_add(1);
        let req_id = *seq;

        self.resp.write::<u16>(
            MmioReadLessResp::REQ_ID_OFFSET,
            req_id.wrapping_add(REQ_ID_POISON),
        );
        fence(Ordering::SeqCst);
        self.hal
            .write32(offsets::MMIO_REG_READ, mmio_read_request(offset as u16, req_id));

        let mut answered = false;
        for _ in 0..self.timeout_iters {
            if self.resp.read::<u16>(MmioReadLessResp::REQ_ID_OFFSET) == req_id {
                answered = true;
                break;
            }
            self.hal.udelay(self.delay_us);
        }

        if !answered {
            error!(
                "ENA: register read timeout. expected req_id={} offset={:#x}, got req_id={} offset={:#x}",
                req_id,
                offset,
                self.resp.read::<u16>(MmioReadLessResp::REQ_ID_OFFSET),
                self.resp.read::<u16>(MmioReadLessResp::REG_OFF_OFFSET)
            );
            return MMIO_READ_TIMEOUT;
        }

        fence(Ordering::Acquire);
        let reg_off = self.resp.read::<u16>(MmioReadLessResp::REG_OFF_OFFSET);
        if reg_off as u32 != offset {
            warn!(
                "ENA: register read answered for offset {:#x}, requested {:#x}",
                reg_off, offset
            );
        }
        self.resp.read::<u32>(MmioReadLessResp::REG_VAL_OFFSET)
    }
}

impl<H: EnaHal> Drop for MmioReader<H> {
    fn drop(&mut self) {
        self.hal.write32(offsets::MMIO_RESP_LO, 0);
        self.hal.write32(offsets::MMIO_RESP_HI, 0);
    }
}
