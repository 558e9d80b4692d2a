use crate::error::Result;
use crate::models::Candidate;
use crate::services::{nocodb_service::NocoDbService, sms_service::SmsService};
use crate::utils::{token::generate_otp_code, validation::is_valid_phone};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

pub const PHONE_WINDOW_SECS: i64 = 180;
pub const CODE_WINDOW_SECS: i64 = 180;
const NAME_WINDOW_SECS: i64 = 120;
const FREE_TEXT_WINDOW_SECS: i64 = 180;

pub mod prompts {
    pub const PHONE: &str =
        "برای ورود یا ثبت‌نام، لطفاً شماره تلفن همراه خود را با فرمت 09123456789 وارد کنید:";
    pub const SENDING_CODE: &str = "در حال ارسال کد تایید...";
    pub const CODE: &str = "کد ۶ رقمی ارسال شده را وارد کنید:";
    pub const INVALID_CODE: &str =
        "کد وارد شده نامعتبر است. لطفاً صفحه را رفرش کرده و دوباره تلاش کنید.";
    pub const CODE_DELIVERY_FAILED: &str =
        "مشکلی در فرآیند ارسال کد پیش آمد. لطفاً دقایقی دیگر مجددا تلاش کنید.";
    pub const VERIFIED: &str = "احراز هویت با موفقیت انجام شد!";
    pub const LOOKUP_FAILED: &str =
        "در بررسی اطلاعات شما مشکلی پیش آمد. لطفاً دقایقی دیگر مجددا تلاش کنید.";
    pub const NEW_USER: &str =
        "به نظر می‌رسد شما کاربر جدید هستید. برای ساخت پروفایل، لطفاً به چند سوال پاسخ دهید.";
    pub const FIRST_NAME: &str = "نام شما چیست؟";
    pub const LAST_NAME: &str = "نام خانوادگی شما چیست؟";
    pub const EXPERTISE: &str = "بسیار عالی. لطفاً تخصص و مهارت‌های اصلی خود را به طور خلاصه بنویسید (مثلاً: برنامه‌نویس پایتون، کارشناس فروش).";
    pub const WORK_EXPERIENCE: &str = "و در نهایت، سابقه کار خود را به طور خلاصه شرح دهید (مثلاً: ۵ سال توسعه نرم‌افزار، ۲ سال مدیریت پروژه).";
    pub const EMPTY_ANSWER: &str = "پاسخ نمی‌تواند خالی باشد.";
    pub const PROFILE_CREATED: &str = "پروفایل شما با موفقیت ساخته شد!";
    pub const PROFILE_FAILED: &str = "متاسفانه در ساخت پروفایل شما مشکلی پیش آمد.";
    pub const TIMED_OUT: &str =
        "زمان پاسخ‌گویی به پایان رسید. لطفاً یک گفتگوی جدید را آغاز کنید.";
    pub const CLOSED: &str = "این گفتگو پایان یافته است. لطفاً یک گفتگوی جدید را آغاز کنید.";

    pub fn invalid_phone(input: &str) -> String {
        format!(
            "فرمت شماره «{}» نامعتبر است. لطفاً یک شماره ۱۱ رقمی صحیح وارد کنید.",
            input
        )
    }
}

/// Side effects the flow needs from the outside world.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthGateway: Send + Sync {
    fn generate_code(&self) -> String;
    async fn send_code(&self, phone: &str, code: &str) -> Result<()>;
    async fn find_candidate(&self, phone: &str) -> Result<Option<Candidate>>;
    async fn create_candidate(&self, candidate: &Candidate) -> Result<Candidate>;
}

/// Production gateway: NocoDB for candidates, the n8n webhook for codes.
#[derive(Clone)]
pub struct AuthBackend {
    records: NocoDbService,
    sms: SmsService,
}

impl AuthBackend {
    pub fn new(records: NocoDbService, sms: SmsService) -> Self {
        Self { records, sms }
    }
}

#[async_trait]
impl AuthGateway for AuthBackend {
    fn generate_code(&self) -> String {
        generate_otp_code()
    }

    async fn send_code(&self, phone: &str, code: &str) -> Result<()> {
        self.sms.send_code(phone, code).await
    }

    async fn find_candidate(&self, phone: &str) -> Result<Option<Candidate>> {
        self.records.find_one::<Candidate>("PhoneNumber", phone).await
    }

    async fn create_candidate(&self, candidate: &Candidate) -> Result<Candidate> {
        self.records.create(candidate).await
    }
}

#[derive(Debug, Clone)]
pub struct PendingCode {
    code: String,
    expires_at: DateTime<Utc>,
}

impl PendingCode {
    fn issue(code: String, now: DateTime<Utc>) -> Self {
        Self {
            code,
            expires_at: now + Duration::seconds(CODE_WINDOW_SECS),
        }
    }

    fn matches(&self, input: &str, now: DateTime<Utc>) -> bool {
        now <= self.expires_at && bool::from(self.code.as_bytes().ct_eq(input.as_bytes()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    FirstName,
    LastName,
    Expertise,
    WorkExperience,
}

impl OnboardingStep {
    fn prompt(self) -> &'static str {
        match self {
            OnboardingStep::FirstName => prompts::FIRST_NAME,
            OnboardingStep::LastName => prompts::LAST_NAME,
            OnboardingStep::Expertise => prompts::EXPERTISE,
            OnboardingStep::WorkExperience => prompts::WORK_EXPERIENCE,
        }
    }

    fn window(self) -> Duration {
        match self {
            OnboardingStep::FirstName | OnboardingStep::LastName => {
                Duration::seconds(NAME_WINDOW_SECS)
            }
            OnboardingStep::Expertise | OnboardingStep::WorkExperience => {
                Duration::seconds(FREE_TEXT_WINDOW_SECS)
            }
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            OnboardingStep::FirstName => Some(OnboardingStep::LastName),
            OnboardingStep::LastName => Some(OnboardingStep::Expertise),
            OnboardingStep::Expertise => Some(OnboardingStep::WorkExperience),
            OnboardingStep::WorkExperience => None,
        }
    }

    fn record(self, draft: &mut Candidate, answer: String) {
        let slot = match self {
            OnboardingStep::FirstName => &mut draft.first_name,
            OnboardingStep::LastName => &mut draft.last_name,
            OnboardingStep::Expertise => &mut draft.expertise,
            OnboardingStep::WorkExperience => &mut draft.work_experience,
        };
        *slot = Some(answer);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    InvalidCode,
    CodeDelivery,
    Lookup,
    ProfileCreation,
}

#[derive(Debug, Clone)]
pub enum FlowState {
    AwaitPhone {
        deadline: DateTime<Utc>,
    },
    AwaitCode {
        phone: String,
        pending: PendingCode,
        deadline: DateTime<Utc>,
    },
    Onboarding {
        phone: String,
        step: OnboardingStep,
        draft: Candidate,
        deadline: DateTime<Utc>,
    },
    Authenticated(Candidate),
    Failed(FailureReason),
}

/// Phone + one-time code login followed by onboarding for unknown numbers.
/// The machine is resumed once per inbound message via [`AuthFlow::advance`].
#[derive(Debug, Clone)]
pub struct AuthFlow {
    state: FlowState,
}

impl AuthFlow {
    /// Returns the flow together with its opening prompt.
    pub fn start(now: DateTime<Utc>) -> (Self, &'static str) {
        let flow = Self {
            state: FlowState::AwaitPhone {
                deadline: now + Duration::seconds(PHONE_WINDOW_SECS),
            },
        };
        (flow, prompts::PHONE)
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn profile(&self) -> Option<&Candidate> {
        match &self.state {
            FlowState::Authenticated(candidate) => Some(candidate),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, FlowState::Failed(_))
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            FlowState::AwaitPhone { deadline }
            | FlowState::AwaitCode { deadline, .. }
            | FlowState::Onboarding { deadline, .. } => Some(*deadline),
            FlowState::Authenticated(_) | FlowState::Failed(_) => None,
        }
    }

    /// Fails the flow if the current prompt window has closed. Returns the
    /// message to show when that happens.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Option<&'static str> {
        match self.deadline() {
            Some(deadline) if now > deadline => {
                info!(%deadline, "Authentication prompt timed out");
                self.state = FlowState::Failed(FailureReason::Timeout);
                Some(prompts::TIMED_OUT)
            }
            _ => None,
        }
    }

    /// Feeds one user message into the machine and returns the replies.
    pub async fn advance(
        &mut self,
        gateway: &dyn AuthGateway,
        input: &str,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        if let Some(timed_out) = self.expire(now) {
            return vec![timed_out.to_string()];
        }

        let input = input.trim();
        let state = std::mem::replace(&mut self.state, FlowState::Failed(FailureReason::Timeout));
        let (next, replies) = match state {
            FlowState::AwaitPhone { .. } => {
                if is_valid_phone(input) {
                    Self::issue_code(gateway, input.to_string(), now).await
                } else {
                    (
                        FlowState::AwaitPhone {
                            deadline: now + Duration::seconds(PHONE_WINDOW_SECS),
                        },
                        vec![prompts::invalid_phone(input), prompts::PHONE.to_string()],
                    )
                }
            }
            FlowState::AwaitCode { phone, pending, .. } => {
                // Taken before comparing: one attempt per code.
                if pending.matches(input, now) {
                    Self::lookup(gateway, phone, now).await
                } else {
                    warn!(phone = %phone, "One-time code rejected");
                    (
                        FlowState::Failed(FailureReason::InvalidCode),
                        vec![prompts::INVALID_CODE.to_string()],
                    )
                }
            }
            FlowState::Onboarding {
                phone,
                step,
                mut draft,
                ..
            } => {
                if input.is_empty() {
                    (
                        FlowState::Onboarding {
                            phone,
                            step,
                            draft,
                            deadline: now + step.window(),
                        },
                        vec![prompts::EMPTY_ANSWER.to_string(), step.prompt().to_string()],
                    )
                } else {
                    step.record(&mut draft, input.to_string());
                    match step.next() {
                        Some(next) => (
                            FlowState::Onboarding {
                                phone,
                                step: next,
                                draft,
                                deadline: now + next.window(),
                            },
                            vec![next.prompt().to_string()],
                        ),
                        None => Self::create_profile(gateway, phone, draft).await,
                    }
                }
            }
            FlowState::Authenticated(candidate) => (FlowState::Authenticated(candidate), Vec::new()),
            FlowState::Failed(reason) => {
                (FlowState::Failed(reason), vec![prompts::CLOSED.to_string()])
            }
        };

        self.state = next;
        replies
    }

    async fn issue_code(
        gateway: &dyn AuthGateway,
        phone: String,
        now: DateTime<Utc>,
    ) -> (FlowState, Vec<String>) {
        let code = gateway.generate_code();
        let mut replies = vec![prompts::SENDING_CODE.to_string()];

        if let Err(e) = gateway.send_code(&phone, &code).await {
            warn!(phone = %phone, error = %e, "Could not deliver one-time code");
            replies.push(prompts::CODE_DELIVERY_FAILED.to_string());
            return (FlowState::Failed(FailureReason::CodeDelivery), replies);
        }

        replies.push(prompts::CODE.to_string());
        let state = FlowState::AwaitCode {
            phone,
            pending: PendingCode::issue(code, now),
            deadline: now + Duration::seconds(CODE_WINDOW_SECS),
        };
        (state, replies)
    }

    async fn lookup(
        gateway: &dyn AuthGateway,
        phone: String,
        now: DateTime<Utc>,
    ) -> (FlowState, Vec<String>) {
        let mut replies = vec![prompts::VERIFIED.to_string()];

        match gateway.find_candidate(&phone).await {
            Ok(Some(candidate)) => {
                info!(phone = %phone, id = ?candidate.id, "Returning candidate authenticated");
                (FlowState::Authenticated(candidate), replies)
            }
            Ok(None) => {
                info!(phone = %phone, "New candidate, starting onboarding");
                let step = OnboardingStep::FirstName;
                replies.push(prompts::NEW_USER.to_string());
                replies.push(step.prompt().to_string());
                let state = FlowState::Onboarding {
                    phone,
                    step,
                    draft: Candidate::default(),
                    deadline: now + step.window(),
                };
                (state, replies)
            }
            Err(e) => {
                warn!(phone = %phone, error = %e, "Candidate lookup failed");
                replies.push(prompts::LOOKUP_FAILED.to_string());
                (FlowState::Failed(FailureReason::Lookup), replies)
            }
        }
    }

    async fn create_profile(
        gateway: &dyn AuthGateway,
        phone: String,
        mut draft: Candidate,
    ) -> (FlowState, Vec<String>) {
        draft.phone_number = Some(phone);

        match gateway.create_candidate(&draft).await {
            Ok(candidate) => {
                info!(id = ?candidate.id, "Candidate profile created");
                (
                    FlowState::Authenticated(candidate),
                    vec![prompts::PROFILE_CREATED.to_string()],
                )
            }
            Err(e) => {
                warn!(error = %e, "Candidate profile creation failed");
                (
                    FlowState::Failed(FailureReason::ProfileCreation),
                    vec![prompts::PROFILE_FAILED.to_string()],
                )
            }
        }
    }
}
