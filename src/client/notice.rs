use crate::error::ZakiError;

pub const LOAD_FAILED: &str = "حدث خطأ أثناء تحميل بيانات المستخدم";
pub const COUNT_UPDATE_FAILED: &str = "حدث خطأ أثناء تحديث عدد الأسئلة";
pub const SUBMIT_FAILED: &str = "حدث خطأ أثناء إرسال السؤال";
pub const SIGNED_IN: &str = "تم تسجيل الدخول بنجاح";
pub const SIGNED_UP: &str = "تم إنشاء الحساب بنجاح. يمكنك الآن تسجيل الدخول.";
pub const SIGNED_OUT: &str = "تم تسجيل الخروج بنجاح";
pub const RESET_SENT: &str = "تم إرسال رابط إعادة تعيين كلمة المرور إلى بريدك الإلكتروني";

pub const SIGN_IN_FAILED: &str = "فشل تسجيل الدخول";
pub const SIGN_UP_FAILED: &str = "فشل إنشاء الحساب";
pub const SIGN_OUT_FAILED: &str = "فشل تسجيل الخروج";
pub const RESET_FAILED: &str = "فشل إرسال رابط إعادة تعيين كلمة المرور";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A short user-facing message (a toast, in a browser).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    /// `"<prefix>: <localized reason>"`
    pub fn failure(prefix: &str, err: &ZakiError) -> Self {
        Self::error(format!("{prefix}: {}", err.user_message()))
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}
