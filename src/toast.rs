/// Short-lived notices shown in the corner of the page
pub const DEFAULT_DURATION_MS: u64 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Log,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u32,
    pub message: String,
    pub kind: ToastKind,
    /// Milliseconds on the page clock after which the toast goes away
    pub expires_at: u64,
}

/// Visible toasts, oldest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
    last_id: u32,
}

impl ToastQueue {
    /// Add a toast showing from `now_ms` for `duration_ms`; returns its id
    pub fn push(&mut self, message: impl Into<String>, kind: ToastKind, now_ms: u64, duration_ms: u64) -> u32 {
        self.last_id += 1;
        self.toasts.push(Toast {
            id: self.last_id,
            message: message.into(),
            kind,
            expires_at: now_ms.saturating_add(duration_ms),
        });
        self.last_id
    }

    pub fn error(&mut self, message: impl Into<String>, now_ms: u64) -> u32 {
        self.push(message, ToastKind::Error, now_ms, DEFAULT_DURATION_MS)
    }

    pub fn warning(&mut self, message: impl Into<String>, now_ms: u64) -> u32 {
        self.push(message, ToastKind::Warning, now_ms, DEFAULT_DURATION_MS)
    }

    pub fn success(&mut self, message: impl Into<String>, now_ms: u64) -> u32 {
        self.push(message, ToastKind::Success, now_ms, DEFAULT_DURATION_MS)
    }

    pub fn log(&mut self, message: impl Into<String>, now_ms: u64) -> u32 {
        self.push(message, ToastKind::Log, now_ms, DEFAULT_DURATION_MS)
    }

    /// Returns whether a toast was removed
    pub fn remove(&mut self, id: u32) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|toast| toast.id != id);
        self.toasts.len() != before
    }

    /// Drop every toast whose time is up
    pub fn expire(&mut self, now_ms: u64) {
        self.toasts.retain(|toast| toast.expires_at > now_ms);
    }

    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase() {
        let mut queue = ToastQueue::default();

        let first = queue.log("saved", 0);
        let second = queue.error("failed", 0);

        assert!(second > first);
        assert_eq!(queue.toasts().len(), 2);
        assert_eq!(queue.toasts()[1].kind, ToastKind::Error);
    }

    #[test]
    fn test_expire_after_default_duration() {
        let mut queue = ToastQueue::default();
        queue.success("Tag updated", 1_000);
        queue.push("long", ToastKind::Warning, 1_000, 10_000);

        queue.expire(3_999);
        assert_eq!(queue.toasts().len(), 2);

        queue.expire(4_000);
        assert_eq!(queue.toasts().len(), 1);
        assert_eq!(queue.toasts()[0].message, "long");

        queue.expire(11_000);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut queue = ToastQueue::default();
        let id = queue.warning("careful", 0);

        assert!(queue.remove(id));
        assert!(!queue.remove(id));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_removed_ids_are_not_reused() {
        let mut queue = ToastQueue::default();
        let id = queue.log("a", 0);
        queue.remove(id);

        assert_eq!(queue.log("b", 0), id + 1);
    }
}
