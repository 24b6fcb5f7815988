use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Server view of whether an OAuth user still owes profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatus {
    #[serde(default)]
    pub is_new_user: bool,
    #[serde(default)]
    pub needs_additional_info: bool,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// What `check_onboarding` ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnboardingOutcome {
    /// No OAuth login indicator was present; nothing was fetched.
    Skipped,
    /// The completion prompt was shown.
    Prompted(OnboardingStatus),
    /// Markers were cleared because no prompt is needed (or the status could
    /// not be fetched).
    Cleared,
}

/// Profile completion submitted from the onboarding prompt.
///
/// Every field is optional at the type level because the prompt may be
/// submitted half-filled; `validate` rejects the missing required ones before
/// anything is sent.
#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingForm {
    #[validate(required(message = "user id is required"))]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, max = 15, message = "nickname must be 2-15 characters"))]
    pub nickname: Option<String>,
    #[validate(
        required(message = "gender is required"),
        length(min = 1, message = "gender is required")
    )]
    pub gender: Option<String>,
    #[validate(required(message = "birthday is required"))]
    pub birthday: Option<NaiveDate>,
}

impl OnboardingForm {
    /// Blank text inputs count as absent.
    pub fn normalized(self) -> Self {
        fn non_blank(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            user_id: self.user_id,
            nickname: non_blank(self.nickname),
            gender: non_blank(self.gender),
            birthday: self.birthday,
        }
    }
}
