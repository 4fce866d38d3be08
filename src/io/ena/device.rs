// ============================================================================
// src/io/ena/device.rs - ENA Device Lifecycle
// ============================================================================
//!
//! # デバイスライフサイクル
//!
//! ```text
//! EnaDevice::new ─> reset_device ─> validate_version ─> admin_init
//!      │                                                   │
//!      │            aenq_enable / get_dev_attr_feat <──────┘
//!      │
//!      └─ 障害時: abort_admin_commands ─> wait_for_abort_completion
//!                 ─> reset_device ─> admin_destroy ─> admin_init
//! ```
//!
//! 管理キューの生成・破棄は `&mut self`、コマンド実行と割り込み処理は
//! `&self` で行う。

use alloc::sync::Arc;
use hashbrown::HashMap;
use log::{debug, error, info};

use super::admin::{AdminQueue, AdminStatsSnapshot};
use super::aenq::{Aenq, AenqHandlers};
use super::commands::{AcqEntry, AqEntry};
use super::config::AdminConfig;
use super::defs::{MIN_ENA_CTRL_VER, MIN_ENA_VER, MMIO_READ_TIMEOUT};
use super::error::{EnaError, Result};
use super::io_queue::IoQueuePair;
use super::mmio::MmioReader;
use super::regs::{
    DevControl, DevStatus, EnaCapabilities, EnaControllerVersion, EnaVersion, offsets,
};
use crate::io::hal::EnaHal;

/// ENA デバイス
pub struct EnaDevice<H: EnaHal> {
    pub(super) io_queues: HashMap<u16, IoQueuePair<H>>,
    aenq: Option<Aenq<H>>,
    admin: Option<AdminQueue<H>>,
    mmio: MmioReader<H>,
    pub(super) hal: Arc<H>,
    config: AdminConfig,
    /// 拡張統計の対象 function / queue
    pub(super) stats_func: u16,
    pub(super) stats_queue: u16,
}

impl<H: EnaHal> EnaDevice<H> {
    /// readless 読み出しを準備する
    pub fn new(hal: Arc<H>, config: AdminConfig) -> Result<Self> {
        config.validate()?;
        let mmio = MmioReader::new(Arc::clone(&hal), &config)?;
        Ok(Self {
            io_queues: HashMap::new(),
            aenq: None,
            admin: None,
            mmio,
            hal,
            config,
            stats_func: 0,
            stats_queue: 0,
        })
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub fn mmio(&self) -> &MmioReader<H> {
        &self.mmio
    }

    /// レジスタを読む（失敗時 `0xFFFF_FFFF`）
    pub fn read_register(&self, offset: u32) -> u32 {
        self.mmio.read32(offset)
    }

    fn read_checked(&self, offset: u32) -> Result<u32> {
        match self.mmio.read32(offset) {
            MMIO_READ_TIMEOUT => {
                error!("ENA: register read timeout at {:#x}", offset);
                Err(EnaError::Timeout)
            }
            value => Ok(value),
        }
    }

    // ========================================================================
    // Reset / version
    // ========================================================================

    /// デバイスリセットのハンドシェイク
    pub fn reset_device(&self) -> Result<()> {
        let stat = self.mmio.read32(offsets::DEV_STS);
        let cap = self.mmio.read32(offsets::CAPS);
        if stat == MMIO_READ_TIMEOUT || cap == MMIO_READ_TIMEOUT {
            error!("ENA: register read timeout before reset");
            return Err(EnaError::Timeout);
        }

        if !DevStatus::from_bits_truncate(stat).contains(DevStatus::READY) {
            error!("ENA: device isn't ready, can't reset device");
            return Err(EnaError::InvalidState);
        }

        let timeout = EnaCapabilities::from_raw(cap).reset_timeout();
        if timeout == 0 {
            error!("ENA: invalid reset timeout value");
            return Err(EnaError::InvalidState);
        }

        self.hal
            .write32(offsets::DEV_CTL, DevControl::DEV_RESET.bits());
        // リセットで応答アドレスが消えるので書き直す
        self.mmio.write_dev_addr();

        self.wait_for_reset_state(timeout, true).inspect_err(|_| {
            error!("ENA: reset indication didn't turn on");
        })?;

        self.hal.write32(offsets::DEV_CTL, 0);
        self.wait_for_reset_state(timeout, false).inspect_err(|_| {
            error!("ENA: reset indication didn't turn off");
        })?;

        debug!("ENA: device reset done");
        Ok(())
    }

    fn wait_for_reset_state(&self, timeout: u32, in_progress: bool) -> Result<()> {
        for _ in 0..timeout {
            let sts = DevStatus::from_bits_truncate(self.read_checked(offsets::DEV_STS)?);
            if sts.contains(DevStatus::RESET_IN_PROGRESS) == in_progress {
                return Ok(());
            }
            self.hal.msleep(self.config.reset_poll_interval_ms);
        }
        Err(EnaError::Timeout)
    }

    /// デバイス・コントローラのバージョンが最低要件を満たすか
    pub fn validate_version(&self) -> Result<()> {
        let ver = self.mmio.read32(offsets::VERSION);
        let ctrl_ver = self.mmio.read32(offsets::CONTROLLER_VERSION);
        if ver == MMIO_READ_TIMEOUT || ctrl_ver == MMIO_READ_TIMEOUT {
            error!("ENA: register read timeout while reading versions");
            return Err(EnaError::Timeout);
        }

        let v = EnaVersion::from_raw(ver);
        info!("ENA: device version {}.{}", v.major(), v.minor());
        if ver < MIN_ENA_VER {
            error!("ENA: device version is lower than the minimal supported version");
            return Err(EnaError::VersionMismatch);
        }

        let cv = EnaControllerVersion::from_raw(ctrl_ver);
        info!(
            "ENA: controller version {}.{}.{} implementation {}",
            cv.major(),
            cv.minor(),
            cv.subminor(),
            cv.impl_id()
        );
        if cv.value() < MIN_ENA_CTRL_VER {
            error!("ENA: controller version is lower than the minimal supported version");
            return Err(EnaError::VersionMismatch);
        }

        Ok(())
    }

    /// DMA アドレス幅（ビット）
    pub fn dma_width(&self) -> Result<u32> {
        let width = EnaCapabilities::from_raw(self.read_checked(offsets::CAPS)?).dma_addr_width();
        debug!("ENA: dma width {}", width);
        if width == 0 {
            error!("ENA: invalid dma width");
            return Err(EnaError::InvalidState);
        }
        Ok(width)
    }

    // ========================================================================
    // Admin queue lifecycle
    // ========================================================================

    /// 管理キューと AENQ を生成し、デバイスへ登録する
    ///
    /// 途中で失敗した場合、それまでに確保した資源はすべて解放される。
    pub fn admin_init(&mut self, handlers: AenqHandlers) -> Result<()> {
        let dev_sts = self.read_checked(offsets::DEV_STS)?;
        if !DevStatus::from_bits_truncate(dev_sts).contains(DevStatus::READY) {
            error!("ENA: device isn't ready, abort admin init");
            return Err(EnaError::DeviceNotReady);
        }

        self.admin_destroy();

        let admin = AdminQueue::new(Arc::clone(&self.hal), &self.config)?;
        let aenq = Aenq::new(Arc::clone(&self.hal), self.config.aenq_depth, handlers)?;

        admin.set_running_state(true);
        self.admin = Some(admin);
        self.aenq = Some(aenq);
        Ok(())
    }

    /// 管理キューと AENQ を解放する（何度呼んでもよい）
    pub fn admin_destroy(&mut self) {
        if self.admin.take().is_some() {
            debug!("ENA: admin queue destroyed");
        }
        self.aenq = None;
    }

    /// 生成済みの管理キュー
    pub fn admin_queue(&self) -> Result<&AdminQueue<H>> {
        self.admin.as_ref().ok_or(EnaError::DeviceNotReady)
    }

    pub fn aenq(&self) -> Result<&Aenq<H>> {
        self.aenq.as_ref().ok_or(EnaError::DeviceNotReady)
    }

    pub fn execute_command(
        &self,
        cmd: &AqEntry,
        cmd_size: usize,
        comp: &mut AcqEntry,
        comp_size: usize,
    ) -> Result<()> {
        self.admin_queue()?
            .execute_command(cmd, cmd_size, comp, comp_size)
    }

    pub fn set_admin_running_state(&self, running: bool) {
        if let Some(admin) = &self.admin {
            admin.set_running_state(running);
        }
    }

    pub fn admin_running_state(&self) -> bool {
        self.admin.as_ref().is_some_and(|a| a.running_state())
    }

    pub fn set_admin_polling_mode(&self, polling: bool) {
        if let Some(admin) = &self.admin {
            admin.set_polling_mode(polling);
        }
    }

    pub fn admin_polling_mode(&self) -> bool {
        self.admin.as_ref().is_some_and(|a| a.polling_mode())
    }

    pub fn admin_stats(&self) -> AdminStatsSnapshot {
        self.admin
            .as_ref()
            .map(|a| a.stats())
            .unwrap_or_default()
    }

    /// 管理割り込み（MSI-X）: ACQ を回収
    pub fn admin_interrupt_handler(&self) -> u16 {
        self.admin.as_ref().map_or(0, |a| a.drain_completions())
    }

    // ========================================================================
    // AENQ
    // ========================================================================

    /// イベント送信を許可
    pub fn aenq_enable(&self) -> Result<()> {
        self.aenq()?.enable();
        Ok(())
    }

    /// AENQ 割り込み: 到着済みイベントを処理
    pub fn aenq_interrupt_handler(&self) -> u16 {
        self.aenq.as_ref().map_or(0, |q| q.handle_interrupt())
    }

    // ========================================================================
    // Abort
    // ========================================================================

    /// 待機中の管理コマンドをすべて中断
    pub fn abort_admin_commands(&self) {
        if let Some(admin) = &self.admin {
            admin.abort_all();
        }
    }

    /// 中断されたコマンドの待機側がすべて戻るまで待つ
    pub fn wait_for_abort_completion(&self) {
        if let Some(admin) = &self.admin {
            admin.wait_for_abort_completion();
        }
    }
}
