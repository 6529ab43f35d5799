//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - ハンドシェイク時のニックネーム検証、許可リストの適用、接続の登録、直近の履歴の取得
//!
//! ### なぜこのテストが必要か
//! - 許可リストに無いニックネームが一度でも登録されると broadcast を受信できてしまう
//! - 接続直後に受け取る履歴の順序はクライアントの表示順そのもの
//!
//! ### どのような状況を想定しているか
//! - 正常系：許可されたニックネームでの接続と履歴の取得
//! - 異常系：ニックネーム無し、許可リスト外のニックネーム
//! - エッジケース：履歴の読み出しに失敗しても接続自体は成立する

use std::sync::Arc;

use crate::domain::{
    AccessPolicy, ConnectionId, DEFAULT_HISTORY_LIMIT, Message, MessagePusher, MessageRepository,
    Nickname, PusherChannel,
};

use super::error::ConnectError;

/// 接続が成立した参加者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedParticipant {
    pub nickname: Nickname,
    /// 接続直後にこの接続だけに送る履歴（昇順）
    pub backlog: Vec<Message>,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn MessageRepository>,
    /// MessagePusher（接続の登録先）
    message_pusher: Arc<dyn MessagePusher>,
    policy: Arc<AccessPolicy>,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        policy: Arc<AccessPolicy>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            policy,
        }
    }

    /// 参加者接続を実行
    ///
    /// # Arguments
    ///
    /// * `connection_id` - この接続の ID
    /// * `nickname` - ハンドシェイクで受け取ったニックネーム（無ければ `None`）
    /// * `sender` - クライアントへのメッセージ送信用チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(ConnectedParticipant)` - 登録済み。直近の履歴を含む
    /// * `Err(ConnectError)` - 登録されていない
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        nickname: Option<String>,
        sender: PusherChannel,
    ) -> Result<ConnectedParticipant, ConnectError> {
        // 1. ニックネームの有無
        let nickname = nickname
            .and_then(|value| Nickname::new(value).ok())
            .ok_or(ConnectError::NicknameRequired)?;

        // 2. 許可リスト
        if !self.policy.allowed(nickname.as_str()) {
            return Err(ConnectError::Forbidden(nickname.into_string()));
        }

        // 3. MessagePusher に接続を登録
        //    履歴の読み出しより先に登録するので、この間に保存されたメッセージは
        //    取りこぼさない（履歴と重複した分は送信側で落とす）
        self.message_pusher
            .register_client(connection_id, nickname.clone(), sender)
            .await;

        // 4. 直近の履歴（失敗しても接続は維持する）
        let backlog = match self.repository.recent(DEFAULT_HISTORY_LIMIT).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(
                    "Failed to load backlog for '{}': {}",
                    nickname.as_str(),
                    e
                );
                Vec::new()
            }
        };

        Ok(ConnectedParticipant { nickname, backlog })
    }
}
