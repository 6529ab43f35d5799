//! メッセージストアの実装
//!
//! - `inmemory`: プロセス内に保持する実装（デフォルト）
//! - `file`: JSON ファイルに保存するドキュメントストア実装
//!
//! どちらも `collection::MessageCollection` を共有するため、採番・範囲検索・一括削除の
//! 振る舞いは同一です。

pub mod collection;
pub mod file;
pub mod inmemory;

pub use file::JsonFileMessageRepository;
pub use inmemory::InMemoryMessageRepository;
