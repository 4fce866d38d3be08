// ============================================================================
// src/io/ena/features.rs - Get/Set Feature and Statistics
// ============================================================================
//!
//! # 機能・統計コマンド
//!
//! Get/Set Feature はインラインの機能記述子を、拡張統計はコントロール
//! バッファ（DMA）を使う。

use alloc::string::String;
use alloc::vec;
use log::{debug, error};

use super::commands::{
    AdminResponse, AenqFeatureDesc, BasicStats, CtrlBuffInfo, DeviceAttrFeatureDesc, GetFeatCmd,
    GetFeatResp, GetStatsCmd, IntrModerFeatureDesc, LinkFeatureDesc, MemAddr, MtuFeatureDesc,
    OffloadFeatureDesc, QueueFeatureDesc, SetFeatCmd,
};
use super::defs::{FeatureId, StatsType};
use super::device::EnaDevice;
use super::error::{EnaError, Result};
use crate::io::dma::{CoherentBuffer, DeviceRepr};
use crate::io::hal::EnaHal;

/// 初期化時に読むデバイス機能一式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceFeatures {
    pub dev_attr: DeviceAttrFeatureDesc,
    pub max_queues: QueueFeatureDesc,
    pub aenq: AenqFeatureDesc,
    pub offload: OffloadFeatureDesc,
}

impl<H: EnaHal> EnaDevice<H> {
    // ========================================================================
    // Features
    // ========================================================================

    /// Get Feature を発行し、応答全体を返す
    pub fn get_feature(&self, feature_id: FeatureId) -> Result<GetFeatResp> {
        let mut cmd = GetFeatCmd::default();
        cmd.feat_common.feature_id = feature_id as u8;

        self.admin_queue()?.execute(&cmd).inspect_err(|e| {
            error!("ENA: failed to get feature {:?}: {}", feature_id, e);
        })
    }

    /// Set Feature を `desc` 付きで発行
    pub fn set_feature<D: DeviceRepr>(&self, feature_id: FeatureId, desc: &D) -> Result<()> {
        let mut cmd = SetFeatCmd::default();
        cmd.feat_common.feature_id = feature_id as u8;
        cmd.set_desc(desc);

        self.admin_queue()?.execute_no_resp(&cmd).inspect_err(|e| {
            error!("ENA: failed to set feature {:?}: {}", feature_id, e);
        })
    }

    /// デバイス属性・キュー上限・AENQ グループ・オフロードを順に取得
    pub fn get_dev_attr_feat(&self) -> Result<DeviceFeatures> {
        Ok(DeviceFeatures {
            dev_attr: self.get_feature(FeatureId::DeviceAttributes)?.desc(),
            max_queues: self.get_feature(FeatureId::MaxQueuesNum)?.desc(),
            aenq: self.get_feature(FeatureId::AenqConfig)?.desc(),
            offload: self.get_feature(FeatureId::StatelessOffloadConfig)?.desc(),
        })
    }

    pub fn get_link_params(&self) -> Result<LinkFeatureDesc> {
        Ok(self.get_feature(FeatureId::LinkConfig)?.desc())
    }

    pub fn get_offload_settings(&self) -> Result<OffloadFeatureDesc> {
        match self.get_feature(FeatureId::StatelessOffloadConfig) {
            Ok(resp) => Ok(resp.desc()),
            Err(e) => {
                error!("ENA: failed to get offload capabilities: {}", e);
                Err(EnaError::InvalidArgument)
            }
        }
    }

    pub fn set_mtu(&self, mtu: u32) -> Result<()> {
        self.set_feature(FeatureId::Mtu, &MtuFeatureDesc { mtu })
            .map_err(|e| {
                error!("ENA: failed to set mtu {}: {}", mtu, e);
                EnaError::InvalidArgument
            })
    }

    /// キュー `qid` の CQ に割り込みモデレーションを設定
    ///
    /// `enable` が偽なら count/interval は送らない。
    pub fn set_interrupt_moderation(
        &self,
        qid: u16,
        enable: bool,
        count: u16,
        interval: u16,
    ) -> Result<()> {
        let (_, cq) = self.get_io_handlers(qid)?;

        let mut desc = IntrModerFeatureDesc {
            cq_idx: cq.idx(),
            queue_identity: (cq.direction() as u8) & 0x0F,
            ..Default::default()
        };
        if enable {
            desc.flags |= 0x1;
            desc.count = count;
            desc.interval = interval;
        }

        self.set_feature(FeatureId::InterruptModeration, &desc)
            .map_err(|e| {
                error!("ENA: failed to set interrupt moderation: {}", e);
                EnaError::InvalidArgument
            })
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    fn get_stats<R: AdminResponse>(&self, cmd: &GetStatsCmd) -> Result<R> {
        self.admin_queue()?.execute(cmd).inspect_err(|e| {
            error!("ENA: failed to get stats: {}", e);
        })
    }

    pub fn get_basic_stats(&self) -> Result<BasicStats> {
        let cmd = GetStatsCmd {
            stats_type: StatsType::Basic as u8,
            ..Default::default()
        };
        self.get_stats(&cmd)
    }

    /// 拡張統計（デバイスが書くテキスト）を最大 `len` バイト取得
    ///
    /// 対象は `set_stats_target` で選んだ function / queue。
    pub fn get_extended_stats(&self, len: usize) -> Result<String> {
        if len == 0 || len > u32::MAX as usize {
            return Err(EnaError::InvalidArgument);
        }
        let buf = CoherentBuffer::new(&self.hal, len).ok_or(EnaError::OutOfMemory)?;

        let cmd = GetStatsCmd {
            control_buffer: CtrlBuffInfo {
                length: len as u32,
                address: MemAddr::new(buf.dma_addr()),
            },
            stats_type: StatsType::Extended as u8,
            queue_idx: self.stats_queue,
            device_id: self.stats_func,
            ..Default::default()
        };
        self.get_stats::<BasicStats>(&cmd)?;

        let mut raw = vec![0u8; len];
        buf.copy_out(0, &mut raw);
        let end = raw.iter().position(|&b| b == 0).unwrap_or(len);
        raw.truncate(end);
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// 拡張統計の対象を選ぶ
    pub fn set_stats_target(&mut self, func: u16, queue: u16) {
        debug!("ENA: extended stats target func={} queue={}", func, queue);
        self.stats_func = func;
        self.stats_queue = queue;
    }
}
