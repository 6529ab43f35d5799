//! Access policy: nickname allow-list evaluated at the connection boundary.

use std::collections::HashSet;

/// Process-wide access policy, built once at startup and never mutated.
///
/// `None` means no allow-list is configured and every nickname is allowed.
/// A configured but empty list allows nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    allow_list: Option<HashSet<String>>,
}

impl AccessPolicy {
    /// Policy without an allow-list (everyone is allowed)
    pub fn allow_all() -> Self {
        Self { allow_list: None }
    }

    /// Policy restricted to the given nicknames
    pub fn with_allow_list<I, S>(nicknames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow_list: Some(nicknames.into_iter().map(Into::into).collect()),
        }
    }

    /// Build the policy from an optional comma-separated list.
    ///
    /// Entries are trimmed and empty entries are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use sokdo_server::domain::AccessPolicy;
    ///
    /// let policy = AccessPolicy::from_csv(Some("alice, bob,,"));
    /// assert!(policy.allowed("bob"));
    /// assert!(!policy.allowed("mallory"));
    ///
    /// assert!(AccessPolicy::from_csv(None).allowed("anyone"));
    /// ```
    pub fn from_csv(value: Option<&str>) -> Self {
        match value {
            None => Self::allow_all(),
            Some(csv) => Self::with_allow_list(
                csv.split(',')
                    .map(str::trim)
                    .filter(|nickname| !nickname.is_empty()),
            ),
        }
    }

    /// Returns true iff no allow-list is configured or `nickname` is on it.
    pub fn allowed(&self, nickname: &str) -> bool {
        match &self.allow_list {
            None => true,
            Some(list) => list.contains(nickname),
        }
    }

    /// Whether an allow-list is configured at all
    pub fn is_restricted(&self) -> bool {
        self.allow_list.is_some()
    }

    /// Number of allowed nicknames, `None` when unrestricted
    pub fn allow_list_len(&self) -> Option<usize> {
        self.allow_list.as_ref().map(HashSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all_accepts_any_nickname() {
        // テスト項目: 許可リスト未設定の場合、全てのニックネームが許可される
        // given (前提条件):
        let policy = AccessPolicy::allow_all();

        // when (操作):

        // then (期待する結果):
        assert!(policy.allowed("alice"));
        assert!(policy.allowed("홍길동"));
        assert!(!policy.is_restricted());
    }

    #[test]
    fn test_allow_list_accepts_only_members() {
        // テスト項目: 許可リスト設定時はリストに含まれるニックネームのみ許可される
        // given (前提条件):
        let policy = AccessPolicy::with_allow_list(["alice", "bob"]);

        // when (操作):

        // then (期待する結果):
        assert!(policy.allowed("alice"));
        assert!(policy.allowed("bob"));
        assert!(!policy.allowed("mallory"));
        // 完全一致のみ（大文字小文字や空白は区別される）
        assert!(!policy.allowed("Alice"));
        assert!(!policy.allowed(" alice"));
    }

    #[test]
    fn test_from_csv_trims_and_drops_empty_entries() {
        // テスト項目: カンマ区切りの文字列から前後の空白を除去してリストが作られる
        // given (前提条件):
        let csv = " 홍길동 , 김철수,, 이영희 ,";

        // when (操作):
        let policy = AccessPolicy::from_csv(Some(csv));

        // then (期待する結果):
        assert_eq!(policy.allow_list_len(), Some(3));
        assert!(policy.allowed("홍길동"));
        assert!(policy.allowed("김철수"));
        assert!(policy.allowed("이영희"));
    }

    #[test]
    fn test_from_csv_empty_string_denies_everyone() {
        // テスト項目: 空文字列が設定された場合、リストは存在するが空なので全員拒否される
        // given (前提条件):
        let csv = "";

        // when (操作):
        let policy = AccessPolicy::from_csv(Some(csv));

        // then (期待する結果):
        assert!(policy.is_restricted());
        assert!(!policy.allowed("alice"));
    }

    #[test]
    fn test_from_csv_none_allows_everyone() {
        // テスト項目: 設定が無い場合は全員許可される
        // given (前提条件):

        // when (操作):
        let policy = AccessPolicy::from_csv(None);

        // then (期待する結果):
        assert_eq!(policy, AccessPolicy::default());
        assert!(policy.allowed("anyone"));
    }
}
