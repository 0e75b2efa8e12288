use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use services::{
    AuthService, ChatError, ChatProvider, ChatRequest, ChatRole, Clock, FALLBACK_REPLY,
    StudyError, StudyService,
};
use storage::repository::{InMemoryProgressStore, ProgressStore, StorageError};
use storage::{BuiltinCurriculum, CurriculumProvider};
use tinhoc_core::model::{Grade, LessonId, ProgressSnapshot};
use tinhoc_core::navigation::{NavigationError, ScreenKind};
use tinhoc_core::quiz::{Advance, QuizError};
use tinhoc_core::time::fixed_now;

/// Replies from a fixed script, recording every request it sees.
struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ChatError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    fn with(replies: Vec<Result<String, ChatError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn send_message(&self, request: &ChatRequest) -> Result<String, ChatError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ChatError::EmptyResponse))
    }
}

/// In-memory store whose quiz recording can be switched to fail.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryProgressStore,
    fail_records: AtomicBool,
}

#[async_trait]
impl ProgressStore for FlakyStore {
    async fn begin(&self, display_name: &str) -> Result<(), StorageError> {
        self.inner.begin(display_name).await
    }

    async fn set_active_grade(&self, grade: Option<Grade>) -> Result<(), StorageError> {
        self.inner.set_active_grade(grade).await
    }

    async fn mark_lesson_opened(&self, lesson: &LessonId) -> Result<bool, StorageError> {
        self.inner.mark_lesson_opened(lesson).await
    }

    async fn record_quiz_result(&self, correct: u32, total: u32) -> Result<(), StorageError> {
        if self.fail_records.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("disk full".into()));
        }
        self.inner.record_quiz_result(correct, total).await
    }

    async fn read(&self) -> Result<ProgressSnapshot, StorageError> {
        self.inner.read().await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.inner.clear().await
    }
}

const OS_TOPIC: &str = "Hệ điều hành";

fn service_with(
    store: Arc<dyn ProgressStore>,
    provider: Arc<dyn ChatProvider>,
) -> StudyService {
    let clock = Clock::fixed(fixed_now());
    let curriculum = Arc::new(BuiltinCurriculum.load().unwrap());
    StudyService::new(clock, curriculum, store, provider)
        .with_auth(AuthService::new(clock).with_delay(Duration::ZERO))
}

async fn signed_in(store: Arc<dyn ProgressStore>, provider: Arc<dyn ChatProvider>) -> StudyService {
    let mut study = service_with(store, provider);
    study.login("lan@school.edu.vn", "pw").await.unwrap();
    study
}

async fn open_lesson_11_1(study: &mut StudyService) {
    study.select_grade(Grade::new(11)).await.unwrap();
    study.select_topic(OS_TOPIC).unwrap();
    study.select_lesson(&LessonId::new("11-1")).await.unwrap();
}

async fn answer_all(study: &mut StudyService, answers: &[usize]) -> Advance {
    let mut last = None;
    for &answer in answers {
        study.select_answer(answer).unwrap();
        last = Some(study.advance().await.unwrap());
    }
    last.unwrap()
}

#[tokio::test]
async fn perfect_quiz_scores_and_awards_points() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store.clone(), ScriptedProvider::with(vec![])).await;
    open_lesson_11_1(&mut study).await;

    study.start_quiz().unwrap();
    assert_eq!(study.screen().kind(), ScreenKind::Quiz);

    let outcome = answer_all(&mut study, &[1, 2]).await;
    let Advance::Completed(result) = outcome else {
        panic!("quiz should be complete");
    };
    assert_eq!((result.correct, result.total), (2, 2));

    let score = study.quiz_score().unwrap();
    assert_eq!(score.correct, 2);
    assert!(score.review.iter().all(|line| line.is_correct));

    let progress = store.read().await.unwrap();
    assert_eq!(progress.display_name, "lan");
    assert_eq!(progress.total_correct, 2);
    assert_eq!(progress.total_questions, 2);
    assert_eq!(progress.total_points, 20);
}

#[tokio::test]
async fn wrong_answer_review_surfaces_correct_option() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store.clone(), ScriptedProvider::with(vec![])).await;
    open_lesson_11_1(&mut study).await;
    study.start_quiz().unwrap();

    answer_all(&mut study, &[0, 2]).await;

    let score = study.quiz_score().unwrap();
    assert_eq!(score.correct, 1);
    let first = &score.review[0];
    assert!(!first.is_correct);
    assert_eq!(first.selected, Some(0));
    assert_eq!(
        first.correct_option,
        "Đưa vào các lệnh hoặc chọn trên bảng chọn (Menu)"
    );
    assert_eq!(store.read().await.unwrap().total_points, 10);
}

#[tokio::test]
async fn advancing_without_an_answer_is_rejected() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store, ScriptedProvider::with(vec![])).await;
    open_lesson_11_1(&mut study).await;
    study.start_quiz().unwrap();

    let err = study.advance().await.unwrap_err();
    assert!(matches!(
        err,
        StudyError::Quiz(QuizError::NoAnswerSelected { index: 0 })
    ));
}

#[tokio::test]
async fn repeated_attempts_accumulate() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store.clone(), ScriptedProvider::with(vec![])).await;
    open_lesson_11_1(&mut study).await;

    study.start_quiz().unwrap();
    answer_all(&mut study, &[1, 2]).await;
    study.finish_quiz().unwrap();
    assert_eq!(study.screen().kind(), ScreenKind::LessonDetail);
    assert!(study.quiz().is_none());

    study.start_quiz().unwrap();
    answer_all(&mut study, &[1, 0]).await;

    let progress = store.read().await.unwrap();
    assert_eq!(progress.total_correct, 3);
    assert_eq!(progress.total_questions, 4);
    assert_eq!(progress.total_points, 30);
}

#[tokio::test]
async fn failed_recording_can_be_retried_once() {
    let store = Arc::new(FlakyStore::default());
    let mut study = signed_in(store.clone(), ScriptedProvider::with(vec![])).await;
    open_lesson_11_1(&mut study).await;
    study.start_quiz().unwrap();

    store.fail_records.store(true, Ordering::SeqCst);
    study.select_answer(1).unwrap();
    study.advance().await.unwrap();
    study.select_answer(2).unwrap();
    let err = study.advance().await.unwrap_err();
    assert!(matches!(err, StudyError::Storage(_)));
    assert!(study.quiz().unwrap().is_complete());
    assert!(study.has_unrecorded_result());

    store.fail_records.store(false, Ordering::SeqCst);
    assert!(study.retry_record_result().await.unwrap());
    assert!(!study.retry_record_result().await.unwrap());
    assert_eq!(store.read().await.unwrap().total_points, 20);
}

#[tokio::test]
async fn opening_a_lesson_is_idempotent_in_progress() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store.clone(), ScriptedProvider::with(vec![])).await;

    study.select_grade(Grade::new(11)).await.unwrap();
    study.select_topic(OS_TOPIC).unwrap();
    assert!(study.select_lesson(&LessonId::new("11-1")).await.unwrap());
    study.go_back().unwrap();
    assert!(!study.select_lesson(&LessonId::new("11-1")).await.unwrap());

    let progress = store.read().await.unwrap();
    assert_eq!(progress.completed_lessons.len(), 1);
    assert_eq!(progress.grade, Some(Grade::new(11)));

    let stats = study.stats().await.unwrap();
    assert_eq!(stats.completion_for(Grade::new(11)), Some(33));
    assert_eq!(stats.completion_for(Grade::new(12)), Some(0));
    assert_eq!(stats.study_time_display(), "0:00:00");
}

#[tokio::test]
async fn lesson_outside_topic_is_rejected_without_side_effects() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store.clone(), ScriptedProvider::with(vec![])).await;
    study.select_grade(Grade::new(11)).await.unwrap();
    study.select_topic(OS_TOPIC).unwrap();

    let err = study
        .select_lesson(&LessonId::new("11-4"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StudyError::Navigation(NavigationError::LessonNotInTopic { .. })
    ));
    assert_eq!(study.screen().kind(), ScreenKind::LessonList);
    assert!(study.chat().is_none());
    assert!(store.read().await.unwrap().completed_lessons.is_empty());
}

#[tokio::test]
async fn unknown_grade_and_topic_leave_state_unchanged() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store, ScriptedProvider::with(vec![])).await;

    let err = study.select_grade(Grade::new(10)).await.unwrap_err();
    assert!(matches!(
        err,
        StudyError::Navigation(NavigationError::InvalidGrade(_))
    ));
    assert_eq!(study.screen().kind(), ScreenKind::Home);

    study.select_grade(Grade::new(12)).await.unwrap();
    let err = study.select_topic(OS_TOPIC).unwrap_err();
    assert!(matches!(
        err,
        StudyError::Navigation(NavigationError::InvalidTopic { .. })
    ));
    assert_eq!(study.screen().kind(), ScreenKind::TopicList);
    assert_eq!(study.topics().unwrap(), vec!["Trí tuệ nhân tạo (AI)"]);
}

#[tokio::test]
async fn chat_reply_is_appended_and_history_replayed() {
    let provider = ScriptedProvider::with(vec![
        Ok("Hệ điều hành quản lý tài nguyên.".into()),
        Ok("Ví dụ: Windows, Linux.".into()),
    ]);
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store, provider.clone()).await;
    open_lesson_11_1(&mut study).await;

    assert_eq!(study.transcript().len(), 1);
    assert!(study.transcript()[0].text.contains("Bài 1: Hệ điều hành"));

    study.send_chat("Hệ điều hành là gì?").await.unwrap();
    let reply = study.send_chat("Cho ví dụ").await.unwrap();
    assert_eq!(reply.text, "Ví dụ: Windows, Linux.");
    assert_eq!(study.transcript().len(), 5);

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].system_instruction.contains("Tin học lớp 11"));
    assert!(requests[0].history.is_empty());
    assert_eq!(requests[1].history.len(), 2);
    assert_eq!(requests[1].history[1].role, ChatRole::Model);
}

#[tokio::test]
async fn second_send_while_waiting_is_busy() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store, ScriptedProvider::with(vec![Ok("ok".into())])).await;
    open_lesson_11_1(&mut study).await;

    let pending = study.begin_chat("câu hỏi 1").unwrap();
    assert!(study.is_typing());
    let err = study.begin_chat("câu hỏi 2").unwrap_err();
    assert!(matches!(err, StudyError::Chat(ChatError::Busy)));
    assert_eq!(study.transcript().len(), 2);

    let provider = study.chat_provider();
    let result = provider.send_message(pending.request()).await;
    assert_eq!(study.complete_chat(pending, result).unwrap().text, "ok");
    assert!(!study.is_typing());
}

#[tokio::test]
async fn provider_failure_yields_single_fallback() {
    let provider = ScriptedProvider::with(vec![Err(ChatError::RequestFailed("timeout".into()))]);
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store, provider).await;
    open_lesson_11_1(&mut study).await;

    let reply = study.send_chat("xin chào").await.unwrap();
    assert_eq!(reply.text, FALLBACK_REPLY);
    assert!(!study.is_typing());
    let fallbacks = study
        .transcript()
        .iter()
        .filter(|message| message.text == FALLBACK_REPLY)
        .count();
    assert_eq!(fallbacks, 1);
}

#[tokio::test]
async fn leaving_the_lesson_discards_chat_and_quiz() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store, ScriptedProvider::with(vec![Ok("late".into())])).await;
    open_lesson_11_1(&mut study).await;
    let pending = study.begin_chat("hỏi").unwrap();
    study.start_quiz().unwrap();

    study.go_back().unwrap();
    assert_eq!(study.screen().kind(), ScreenKind::LessonDetail);
    assert!(study.quiz().is_none());
    assert!(study.chat().is_some());

    study.go_back().unwrap();
    assert_eq!(study.screen().kind(), ScreenKind::LessonList);
    assert!(study.chat().is_none());
    assert!(study.transcript().is_empty());

    // A reply arriving after the chat closed is dropped.
    assert!(study.complete_chat(pending, Ok("late".into())).is_none());
}

#[tokio::test]
async fn reopening_a_lesson_ignores_replies_for_the_old_chat() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store, ScriptedProvider::with(vec![])).await;
    open_lesson_11_1(&mut study).await;
    let pending = study.begin_chat("hỏi").unwrap();

    study.go_back().unwrap();
    study.select_lesson(&LessonId::new("11-1")).await.unwrap();
    assert!(study.complete_chat(pending, Ok("old".into())).is_none());
    assert_eq!(study.transcript().len(), 1);
    assert!(!study.is_typing());
}

#[tokio::test]
async fn return_home_keeps_active_grade() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store.clone(), ScriptedProvider::with(vec![])).await;
    open_lesson_11_1(&mut study).await;

    study.return_home().unwrap();
    assert_eq!(study.screen().kind(), ScreenKind::Home);
    assert!(study.chat().is_none());
    assert_eq!(store.read().await.unwrap().grade, Some(Grade::new(11)));
}

#[tokio::test]
async fn operations_require_login() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = service_with(store, ScriptedProvider::with(vec![]));

    assert!(matches!(
        study.select_grade(Grade::new(11)).await,
        Err(StudyError::NotLoggedIn)
    ));
    assert!(matches!(study.stats().await, Err(StudyError::NotLoggedIn)));
    assert!(matches!(study.logout().await, Err(StudyError::NotLoggedIn)));
}

#[tokio::test]
async fn logout_clears_everything() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = signed_in(store.clone(), ScriptedProvider::with(vec![])).await;
    open_lesson_11_1(&mut study).await;
    study.start_quiz().unwrap();

    study.logout().await.unwrap();
    assert!(!study.is_logged_in());
    assert_eq!(study.screen().kind(), ScreenKind::Home);
    assert!(study.quiz().is_none());
    assert!(study.chat().is_none());
    assert_eq!(store.read().await.unwrap(), ProgressSnapshot::default());
}

#[tokio::test]
async fn blank_credentials_do_not_sign_in() {
    let store = Arc::new(InMemoryProgressStore::new());
    let mut study = service_with(store, ScriptedProvider::with(vec![]));
    let err = study.login("", "pw").await.unwrap_err();
    assert!(matches!(err, StudyError::Auth(_)));
    assert!(!study.is_logged_in());
}
