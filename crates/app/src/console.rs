//! Line-oriented driver over `StudyService`.

use std::fmt;
use std::fmt::Write as _;

use services::{ChatRole, StudyError, StudyService};
use tinhoc_core::model::{Grade, LessonId};
use tinhoc_core::navigation::Screen;
use tinhoc_core::quiz::Advance;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: String, password: String },
    Grades,
    Grade(Grade),
    Topics,
    Topic(String),
    Lessons,
    Lesson(String),
    Back,
    Home,
    Quiz,
    /// Zero-based option index.
    Answer(usize),
    Next,
    Review,
    Done,
    Ask(String),
    Stats,
    Logout,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    InvalidNumber {
        raw: String,
    },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::Unknown(word) => write!(f, "unknown command: {word} (try `help`)"),
            CommandError::MissingArgument { command, argument } => {
                write!(f, "{command} requires <{argument}>")
            }
            CommandError::InvalidNumber { raw } => write!(f, "not a valid number: {raw}"),
        }
    }
}

impl std::error::Error for CommandError {}

/// Parse one input line.
///
/// # Errors
///
/// Returns `CommandError` for blank, unknown or incomplete commands.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Err(CommandError::Empty),
        "login" => {
            let mut parts = rest.split_whitespace();
            let email = parts.next().ok_or(CommandError::MissingArgument {
                command: "login",
                argument: "email",
            })?;
            let password = parts.next().ok_or(CommandError::MissingArgument {
                command: "login",
                argument: "password",
            })?;
            Command::Login {
                email: email.to_string(),
                password: password.to_string(),
            }
        }
        "grades" => Command::Grades,
        "grade" => {
            let raw = required(rest, "grade", "level")?;
            let grade = raw
                .parse::<Grade>()
                .map_err(|_| CommandError::InvalidNumber {
                    raw: raw.to_string(),
                })?;
            Command::Grade(grade)
        }
        "topics" => Command::Topics,
        "topic" => Command::Topic(required(rest, "topic", "name or number")?.to_string()),
        "lessons" => Command::Lessons,
        "lesson" => Command::Lesson(required(rest, "lesson", "id or number")?.to_string()),
        "back" => Command::Back,
        "home" => Command::Home,
        "quiz" => Command::Quiz,
        "answer" | "a" => {
            let raw = required(rest, "answer", "option")?;
            let option = raw
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .ok_or_else(|| CommandError::InvalidNumber {
                    raw: raw.to_string(),
                })?;
            Command::Answer(option)
        }
        "next" | "n" => Command::Next,
        "review" => Command::Review,
        "done" => Command::Done,
        "ask" => Command::Ask(required(rest, "ask", "message")?.to_string()),
        "stats" => Command::Stats,
        "logout" => Command::Logout,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(command)
}

fn required<'a>(
    rest: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument { command, argument })
    } else {
        Ok(rest)
    }
}

pub const HELP: &str = "\
Commands:
  login <email> <password>   sign in
  grades                     list grades
  grade <n>                  choose a grade
  topics | topic <name|#>    list / choose a topic
  lessons | lesson <id|#>    list / open a lesson
  back | home                navigate up / to the start
  quiz                       start the lesson quiz
  answer <#> | next          pick an option / go on
  review | done              show the score / leave the quiz
  ask <message>              ask the tutor about the lesson
  stats | logout | quit";

/// What the driver should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue(String),
    Quit,
}

/// Run one command against the service and render its outcome.
///
/// # Errors
///
/// Returns the `StudyError` of a rejected operation; the service is unchanged.
pub async fn execute(study: &mut StudyService, command: Command) -> Result<Flow, StudyError> {
    let output = match command {
        Command::Login { email, password } => {
            let name = study.login(&email, &password).await?.display_name().to_string();
            format!("Xin chào, {name}!\n{}", render_screen(study))
        }
        Command::Home => {
            study.return_home()?;
            render_screen(study)
        }
        Command::Grades => study
            .grades()
            .iter()
            .map(|grade| format!("Lớp {grade}"))
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Grade(grade) => {
            study.select_grade(grade).await?;
            render_screen(study)
        }
        Command::Topics | Command::Lessons => render_screen(study),
        Command::Topic(raw) => {
            let topic = resolve_topic(study, &raw);
            study.select_topic(&topic)?;
            render_screen(study)
        }
        Command::Lesson(raw) => {
            let id = resolve_lesson(study, &raw);
            study.select_lesson(&id).await?;
            render_screen(study)
        }
        Command::Back => {
            study.go_back()?;
            render_screen(study)
        }
        Command::Quiz => {
            study.start_quiz()?;
            render_screen(study)
        }
        Command::Answer(option) => {
            study.select_answer(option)?;
            format!("Đã chọn đáp án {}.", option + 1)
        }
        Command::Next => match study.advance().await? {
            Advance::Next { .. } => render_screen(study),
            Advance::Completed(result) => format!(
                "Hoàn thành! {}/{} câu đúng, +{} điểm. Gõ `review` để xem lại.",
                result.correct,
                result.total,
                result.points()
            ),
        },
        Command::Review => render_review(study)?,
        Command::Done => {
            study.finish_quiz()?;
            render_screen(study)
        }
        Command::Ask(text) => study.send_chat(&text).await?.text.clone(),
        Command::Stats => {
            let stats = study.stats().await?;
            let mut out = String::new();
            let _ = writeln!(out, "Học sinh: {}", stats.progress.display_name);
            let _ = writeln!(out, "Điểm: {}", stats.progress.total_points);
            let _ = writeln!(
                out,
                "Câu đúng: {}/{}",
                stats.progress.total_correct, stats.progress.total_questions
            );
            if let Some(accuracy) = stats.accuracy_percentage() {
                let _ = writeln!(out, "Độ chính xác: {accuracy}%");
            }
            let _ = writeln!(out, "Bài đã học: {}", stats.progress.completed_lessons.len());
            for entry in &stats.completion {
                let _ = writeln!(out, "  Lớp {}: {}%", entry.grade, entry.percent);
            }
            let _ = write!(out, "Thời gian học: {}", stats.study_time_display());
            out
        }
        Command::Logout => {
            study.logout().await?;
            "Đã đăng xuất.".to_string()
        }
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Flow::Quit),
    };
    Ok(Flow::Continue(output))
}

// A 1-based number picks from the listed topics; anything else is a name.
fn resolve_topic(study: &StudyService, raw: &str) -> String {
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| {
            study
                .topics()
                .ok()
                .and_then(|topics| topics.get(index).map(|topic| (*topic).to_string()))
        })
        .unwrap_or_else(|| raw.to_string())
}

fn resolve_lesson(study: &StudyService, raw: &str) -> LessonId {
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| {
            study
                .lessons()
                .ok()
                .and_then(|lessons| lessons.get(index).map(|lesson| lesson.id.clone()))
        })
        .unwrap_or_else(|| LessonId::new(raw))
}

/// Text view of the current screen.
#[must_use]
pub fn render_screen(study: &StudyService) -> String {
    let mut out = String::new();
    match study.screen() {
        Screen::Home => {
            let _ = writeln!(out, "Chọn lớp:");
            for grade in study.grades() {
                let _ = writeln!(out, "  grade {grade}");
            }
        }
        Screen::TopicList { grade } => {
            let _ = writeln!(out, "Lớp {grade}, chủ đề:");
            for (index, topic) in study.topics().unwrap_or_default().iter().enumerate() {
                let _ = writeln!(out, "  {}. {topic}", index + 1);
            }
        }
        Screen::LessonList { topic, .. } => {
            let _ = writeln!(out, "{topic}:");
            for (index, lesson) in study.lessons().unwrap_or_default().iter().enumerate() {
                let _ = writeln!(out, "  {}. [{}] {}", index + 1, lesson.id, lesson.title);
            }
        }
        Screen::LessonDetail { .. } => {
            if let Some(lesson) = study.current_lesson() {
                let _ = writeln!(out, "{}", lesson.title);
                let _ = writeln!(out, "{}", lesson.summary);
                for point in &lesson.key_points {
                    let _ = writeln!(out, "  • {point}");
                }
                if lesson.has_quiz() {
                    let _ = writeln!(out, "Trắc nghiệm: {} câu (gõ `quiz`).", lesson.question_count());
                }
            }
            for message in study.transcript() {
                let who = match message.role {
                    ChatRole::User => "Em",
                    ChatRole::Model => "Thầy",
                };
                let _ = writeln!(out, "{who}: {}", message.text);
            }
        }
        Screen::Quiz { .. } => {
            if let Some(quiz) = study.quiz() {
                let progress = quiz.progress();
                if let Some(question) = quiz.current_question() {
                    let _ = writeln!(
                        out,
                        "Câu {}/{}: {}",
                        progress.index + 1,
                        progress.total,
                        question.prompt
                    );
                    for (index, option) in question.options.iter().enumerate() {
                        let marker = if quiz.selected_answer() == Some(index) { '>' } else { ' ' };
                        let _ = writeln!(out, " {marker}{}. {option}", index + 1);
                    }
                } else {
                    let _ = writeln!(out, "Bài trắc nghiệm đã xong (gõ `review` hoặc `done`).");
                }
            }
        }
    }
    out.trim_end().to_string()
}

fn render_review(study: &StudyService) -> Result<String, StudyError> {
    let score = study.quiz_score()?;
    let mut out = String::new();
    let _ = writeln!(out, "Kết quả: {}/{}", score.correct, score.total);
    for line in &score.review {
        let verdict = if line.is_correct { "đúng" } else { "sai" };
        let _ = writeln!(out, "{}. {} ({verdict})", line.index + 1, line.prompt);
        if !line.is_correct {
            let _ = writeln!(out, "   Đáp án: {}", line.correct_option);
        }
        if let Some(explanation) = &line.explanation {
            let _ = writeln!(out, "   {explanation}");
        }
    }
    Ok(out.trim_end().to_string())
}
