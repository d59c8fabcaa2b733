//! 阅卷全流程测试
//!
//! 用脚本化的 `VisionExtractor` 代替真实模型：
//! 图片文件的内容就是"模型输出"，这样并发批改时每个学生拿到的输出是确定的

use async_trait::async_trait;
use smart_grader::models::{load_master_key, save_master_key, MasterKeyFile, RawAnswer};
use smart_grader::services::{prompts, score_student, summarize};
use smart_grader::{
    App, AppError, AppResult, Choice, Config, ErrorKind, ExtractionRequest, GradingFlow,
    GradingSession, MasterKey, MasterKeyItem, VisionExtractor,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

/// 把图片字节原样当作模型输出返回；纯文本请求返回固定报告
#[derive(Default)]
struct EchoExtractor {
    master_key_calls: AtomicUsize,
    report_calls: AtomicUsize,
}

#[async_trait]
impl VisionExtractor for EchoExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> AppResult<String> {
        if request.system_message.as_deref() == Some(prompts::MASTER_KEY_SYSTEM) {
            self.master_key_calls.fetch_add(1, Ordering::SeqCst);
        }
        if request.images.is_empty() {
            self.report_calls.fetch_add(1, Ordering::SeqCst);
            return Ok("## 📊 成绩概况\n- 平均分 63.3".to_string());
        }

        let text: Vec<String> = request
            .images
            .iter()
            .map(|image| String::from_utf8_lossy(&image.data).to_string())
            .collect();
        Ok(text.join("\n"))
    }
}

const MASTER_KEY_REPLY: &str = r#"```json
[
  {"number": 1, "correctChoice": "A", "topic": "Cells", "weight": 2},
  {"number": 2, "correctChoice": "B", "topic": "Genetics", "weight": 2},
  {"number": 3, "correctChoice": "C", "topic": "Cells", "weight": 1}
]
```"#;

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "smart_grader_it_{}_{}",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn test_config(root: &Path) -> Config {
    Config {
        llm_api_key: "test".to_string(),
        exam_id: "biologi-7a".to_string(),
        master_key_dir: root.join("soal"),
        master_key_file: root.join("out").join("master_key.toml"),
        students_dir: root.join("siswa"),
        export_file: root.join("out").join("nilai.csv"),
        report_file: root.join("out").join("laporan.md"),
        generate_report: true,
        max_concurrent_students: 2,
        output_log_file: root.join("run.log").to_string_lossy().to_string(),
        warn_file: root.join("warn.txt"),
        ..Config::default()
    }
}

fn scenario_key() -> MasterKey {
    MasterKey::try_from(vec![
        MasterKeyItem::new(1, Choice::A, "Cells", 2.0),
        MasterKeyItem::new(2, Choice::B, "Genetics", 2.0),
        MasterKeyItem::new(3, Choice::C, "Cells", 1.0),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_full_run_generates_key_and_grades_students() {
    let root = scratch_dir("full");
    write_file(&root.join("soal").join("hal_1.jpg"), MASTER_KEY_REPLY);
    write_file(
        &root.join("siswa").join("Ani").join("hal_1.jpg"),
        r#"[{"number":1,"choice":"A"},{"number":2,"choice":"C"},{"number":3,"choice":"C"}]"#,
    );
    write_file(
        &root.join("siswa").join("Budi").join("hal_1.png"),
        "Maaf, foto terlalu buram.",
    );
    write_file(
        &root.join("siswa").join("Citra").join("hal_1.jpg"),
        r#"Jawaban: {"1": "A", "2": "B", "3": "C"}"#,
    );
    // 没有图片的学生：批改失败，但不影响其他人
    std::fs::create_dir_all(root.join("siswa").join("Dewi")).unwrap();

    let config = test_config(&root);
    let extractor = Arc::new(EchoExtractor::default());
    let app = assert_ok!(App::with_extractor(config.clone(), extractor.clone()));
    let session = assert_ok!(app.run().await);

    let names: Vec<&str> = session
        .results()
        .iter()
        .map(|r| r.student_name.as_str())
        .collect();
    assert_eq!(names, vec!["Ani", "Budi", "Citra"]);

    let scores: Vec<u8> = session.results().iter().map(|r| r.final_score).collect();
    assert_eq!(scores, vec![60, 0, 100]);
    assert!(session.results()[1].needs_review());

    // 标准答案已保存，可供人工修改
    let saved = assert_ok!(load_master_key(&config.master_key_file).await);
    assert_eq!(saved.items, scenario_key());
    assert_eq!(saved.exam_id, "biologi-7a");

    let csv = std::fs::read_to_string(&config.export_file).unwrap();
    assert!(csv.contains("No,Student,Final Score,Correct,Earned Weight,Total Weight,Q1,Q2,Q3,Weakest Topic,Feedback"));
    assert!(csv.contains("1,Ani,60,2,3,5,A ✓,C,C ✓,Genetics,"));

    let warn = std::fs::read_to_string(&config.warn_file).unwrap();
    assert!(warn.contains("Budi"));
    assert!(warn.contains("Dewi"));
    assert!(!warn.contains("Ani"));

    let report = std::fs::read_to_string(&config.report_file).unwrap();
    assert!(report.starts_with("## 📊"));
    assert_eq!(extractor.master_key_calls.load(Ordering::SeqCst), 1);
    assert_eq!(extractor.report_calls.load(Ordering::SeqCst), 1);

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_existing_master_key_file_skips_extraction() {
    let root = scratch_dir("cached");
    let config = Config {
        generate_report: false,
        ..test_config(&root)
    };

    let file = MasterKeyFile::new("biologi-7a", scenario_key());
    assert_ok!(save_master_key(&config.master_key_file, &file).await);
    write_file(
        &root.join("siswa").join("Eko").join("1.jpg"),
        r#"[{"number":1,"choice":"B"},{"number":2,"choice":"B"},{"number":3,"choice":"unanswered"}]"#,
    );

    let extractor = Arc::new(EchoExtractor::default());
    let app = assert_ok!(App::with_extractor(config.clone(), extractor.clone()));
    let session = assert_ok!(app.run().await);

    assert_eq!(extractor.master_key_calls.load(Ordering::SeqCst), 0);
    assert_eq!(extractor.report_calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.len(), 1);
    assert_eq!(session.results()[0].final_score, 40);
    assert_eq!(session.results()[0].weakest_topic.as_deref(), Some("Cells"));
    assert!(!config.report_file.exists());

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_malformed_master_key_saves_raw_text() {
    let root = scratch_dir("malformed");
    write_file(
        &root.join("soal").join("hal_1.jpg"),
        "1. A (Sel)\n2. B (Genetika)",
    );
    std::fs::create_dir_all(root.join("siswa")).unwrap();

    let config = test_config(&root);
    let app = assert_ok!(App::with_extractor(
        config.clone(),
        Arc::new(EchoExtractor::default())
    ));
    let err = assert_err!(app.run().await);
    assert!(err.to_string().contains("raw.txt"));
    assert_eq!(
        err.downcast_ref::<AppError>().map(AppError::kind),
        Some(ErrorKind::ExtractionFormat)
    );

    let raw_path = root.join("out").join("master_key.toml.raw.txt");
    assert_eq!(
        std::fs::read_to_string(raw_path).unwrap(),
        "1. A (Sel)\n2. B (Genetika)"
    );
    assert!(!config.master_key_file.exists());

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_grading_operation_without_network() {
    let config = Config {
        llm_api_key: "test".to_string(),
        ..Config::default()
    };
    let flow = GradingFlow::new(Arc::new(EchoExtractor::default()), &config);
    let key = Arc::new(scenario_key());
    let mut session = GradingSession::new("biologi-7a", Arc::clone(&key));

    for (name, raw) in [
        ("Ani", r#"[{"number":1,"choice":"A"},{"number":2,"choice":"B"},{"number":3,"choice":"C"}]"#),
        ("Budi", r#"[{"number":1,"choice":"A"},{"number":3,"choice":"D"}]"#),
        ("Citra", "```json\n[]\n```"),
    ] {
        session.add(assert_ok!(flow.grade_transcript(&key, raw, name)));
    }

    let summary = assert_ok!(session.summary());
    assert_eq!(summary.student_count, 3);
    assert_eq!(summary.distribution.total(), 3);
    assert_eq!(summary.pass_count, 1);
    assert_eq!(summary.topic_count("Genetics"), 1);
    assert_eq!(summary.topic_count("Cells"), 1);

    let err = assert_err!(flow.grade_transcript(&key, "[]", ""));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_scenario_e_summary() {
    let key = MasterKey::try_from(
        (1..=10)
            .map(|n| MasterKeyItem::new(n, Choice::A, "Topik", 1.0))
            .collect::<Vec<_>>(),
    )
    .unwrap();

    let answers = |correct: u32| -> Vec<RawAnswer> {
        (1..=10)
            .map(|n| RawAnswer::new(n, if n <= correct { Choice::A } else { Choice::B }))
            .collect()
    };

    let results = vec![
        score_student(&key, &answers(9), "a"),
        score_student(&key, &answers(6), "b"),
        score_student(&key, &answers(4), "c"),
    ];
    let summary = summarize(&results).unwrap();

    assert_eq!(summary.mean, 63.3);
    assert_eq!(summary.distribution.excellent, 1);
    assert_eq!(summary.distribution.good, 0);
    assert_eq!(summary.distribution.fair, 1);
    assert_eq!(summary.distribution.low, 1);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["distribution"]["90-100"], 1);
    assert_eq!(json["studentCount"], 3);

    assert!(matches!(
        summarize(&[]),
        Err(AppError::Grading(_))
    ));
}
