//! MessagePusher trait 定義
//!
//! 接続中のクライアント集合（Connection Registry）と、そこへのメッセージ配信
//! （Broadcaster）の抽象化です。WebSocket などの具体的な通信手段は
//! Infrastructure 層が提供します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, Message, MessagePushError, Nickname};

/// クライアントへの送信チャンネル
///
/// 各接続の writer タスクが受信側を持ち、受け取った JSON テキストをそのまま送信します。
/// 送信に失敗した場合は writer タスク（= トランスポート）が既に終了しています。
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// MessagePusher trait（Connection Registry & Broadcaster）
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続を登録する
    ///
    /// 同じニックネームの接続が既にあっても別の接続として登録される。
    async fn register_client(
        &self,
        connection_id: ConnectionId,
        nickname: Nickname,
        sender: PusherChannel,
    );

    /// 接続の登録を解除する（冪等）
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 特定の接続にだけ送信する
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 登録中の全接続に配信する
    ///
    /// 1 回の呼び出しで各接続に届くのは高々 1 回。
    /// 配信に失敗した接続は登録解除され、残りの接続への配信は継続される。
    async fn broadcast(&self, message: &Message);

    /// 登録中の接続数
    async fn count_connections(&self) -> usize;
}
