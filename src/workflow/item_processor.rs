//! 单场比赛处理流程 - 流程层
//!
//! 核心职责：定义"一场比赛"的完整处理流程
//!
//! 流程顺序：
//! 1. 打开详情页 → 等待加载
//! 2. 提取主字段
//! 3. 二次提取（尽力而为，失败只留空对象）
//! 4. 盖戳 → 落盘
//!
//! 错误分级：会话致命错误原样向上抛给编排层重启会话，
//! 其余错误只让这一场比赛失败。

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value as JsonValue};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::ItemError;
use crate::infrastructure::RemoteSession;
use crate::models::{InsertPosition, Record};
use crate::services::{FieldExtractor, ResultStore};
use crate::workflow::item_ctx::ItemCtx;

/// 单场比赛的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// 已写入结果文件
    Saved,
    /// 提取成功但写入失败，这条记录只存在于本次运行
    Unpersisted,
}

/// 单场比赛处理流程
///
/// - 不持有会话，每次调用由编排层传入当前会话
/// - 只依赖业务能力（提取器、结果文件）
pub struct ItemProcessor {
    extractor: Arc<dyn FieldExtractor>,
    insert_position: InsertPosition,
    open_timeout: Duration,
    ready_timeout: Duration,
}

impl ItemProcessor {
    pub fn new(config: &Config, extractor: Arc<dyn FieldExtractor>) -> Self {
        Self {
            extractor,
            insert_position: config.insert_position,
            open_timeout: config.timeout_slow(),
            ready_timeout: config.timeout_fast(),
        }
    }

    pub async fn process(
        &self,
        session: &dyn RemoteSession,
        ctx: &ItemCtx,
        store: &ResultStore,
    ) -> Result<ItemOutcome, ItemError> {
        let item = &ctx.item;
        info!("{} 🏀 处理比赛 ({})", ctx, item.stage);

        let url = self.extractor.detail_url(item);
        session.open(&url, self.open_timeout).await?;
        if !session
            .wait_for(self.extractor.ready_selector(), self.ready_timeout)
            .await?
        {
            return Err(ItemError::DetailNotLoaded { url });
        }

        let mut fields = self.extractor.extract(session, item).await?;

        for &name in self.extractor.secondary_fields() {
            let value = match self
                .extractor
                .extract_secondary(name, session, item, &fields)
                .await
            {
                Ok(value) => value,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!("{} ⚠️ 二次提取 {} 失败，记录为空: {}", ctx, name, e);
                    JsonValue::Object(Map::new())
                }
            };
            fields.insert(name.to_string(), value);
        }

        let record = Record::stamped(item, fields);
        debug!("{} 记录字段数: {}", ctx, record.fields.len());

        match store.save_incremental(&record, self.insert_position) {
            Ok(()) => {
                info!("{} ✅ 已保存", ctx);
                Ok(ItemOutcome::Saved)
            }
            Err(e) => {
                error!("{} ❌ 写入结果文件失败，本条记录未持久化: {}", ctx, e);
                Ok(ItemOutcome::Unpersisted)
            }
        }
    }
}
