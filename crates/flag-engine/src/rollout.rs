//! 灰度分桶
//!
//! 把 `(user_id, flag_key)` 确定性地映射到 0..=100 的桶号。桶号只取决于这两个字符串，
//! 与规则内容、调用顺序和时间无关，跨进程、跨语言实现保持一致。

/// 桶的数量，桶号范围为 0..=100
pub const BUCKET_COUNT: u32 = 101;

/// 计算分桶
///
/// 对 `user_id + ":" + flag_key` 做 32 位多项式滚动哈希（`h = h * 31 + c`），
/// 取绝对值后对 101 取模。
pub fn bucket(user_id: &str, flag_key: &str) -> u8 {
    to_bucket(hash(user_id, flag_key))
}

/// 32 位有符号滚动哈希
///
/// 按 UTF-16 编码单元逐个累加，非 ASCII 标识与 UTF-16 字符串运行时的结果一致。
pub fn hash(user_id: &str, flag_key: &str) -> i32 {
    user_id
        .encode_utf16()
        .chain(":".encode_utf16())
        .chain(flag_key.encode_utf16())
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

fn to_bucket(hash: i32) -> u8 {
    // unsigned_abs 覆盖 i32::MIN，结果必然小于 101
    (hash.unsigned_abs() % BUCKET_COUNT) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_buckets() {
        assert_eq!(bucket("user-1", "rollout-flag"), 23);
        assert_eq!(bucket("user-2", "rollout-flag"), 29);
        assert_eq!(bucket("user-123", "new-checkout"), 71);
        assert_eq!(bucket("", ""), 58);
    }

    #[test]
    fn test_non_ascii_identifiers() {
        assert_eq!(bucket("ünïcødé", "flag"), 11);
        // 代理对按两个编码单元参与哈希
        assert_eq!(bucket("😀", "flag"), 26);
    }

    #[test]
    fn test_min_hash_does_not_overflow() {
        assert_eq!(to_bucket(i32::MIN), 34);
        assert_eq!(to_bucket(0), 0);
        assert_eq!(to_bucket(-101), 0);
    }

    #[test]
    fn test_deterministic() {
        let first = bucket("user-42", "beta");
        for _ in 0..100 {
            assert_eq!(bucket("user-42", "beta"), first);
        }
    }

    #[test]
    fn test_range() {
        for i in 0..5000 {
            let b = bucket(&format!("user-{}", i), &format!("flag-{}", i % 7));
            assert!(b <= 100);
        }
    }

    #[test]
    fn test_dispersion() {
        // 顺序 id 大致均匀落在两半
        let included = (0..1000)
            .filter(|i| bucket(&format!("user-{}", i), "gradual") <= 50)
            .count();
        assert_eq!(included, 496);
    }

    #[test]
    fn test_depends_on_flag_key() {
        assert_ne!(bucket("user-1", "rollout-flag"), bucket("user-1", "beta"));
    }
}
