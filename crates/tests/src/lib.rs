//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（无需 ffmpeg）
//! - 多次运行的续写行为

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_default_blueprint_round_trips_through_toml() {
        let blueprint = contracts::DatasetBlueprint::default();
        let toml = config_loader::ConfigLoader::to_toml(&blueprint).unwrap();
        let parsed =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(parsed, blueprint);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::{BTreeSet, HashSet};
    use std::fs;
    use std::path::Path;

    use contracts::{
        DatasetBlueprint, FrameEvent, FrameSize, FrameSource, ReconcileStats, SessionLayout,
    };
    use dispatcher::LabelBucketer;
    use image::GrayImage;
    use ingestion::{
        discover_sessions, expand_sync_counts, read_command_log, read_sync_log, resize_frame,
        SessionPaths, SyntheticFrameSource,
    };
    use observability::RunAggregator;
    use rand::Rng;
    use sync_engine::reconcile;
    use tempfile::tempdir;

    fn write_session(root: &Path, tag: &str, index: u64, sync: &str, commands: &str) {
        let dir = root.join(tag).join(index.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("video.avi"), b"").unwrap();
        fs::write(dir.join("sync.txt"), sync).unwrap();
        fs::write(dir.join("commands.txt"), commands).unwrap();
    }

    /// SyntheticFrameSource -> Expander -> Reconciler -> LabelBucketer
    fn build_session(
        session: &SessionPaths,
        source: &SyntheticFrameSource,
        blueprint: &DatasetBlueprint,
        out: &Path,
    ) -> (ReconcileStats, contracts::BucketerStats) {
        let counts = read_sync_log(&session.sync).unwrap();
        let commands = read_command_log(&session.commands).unwrap();
        let frames = source.open(&session.video).unwrap();

        let events = expand_sync_counts(&counts)
            .zip(frames)
            .map(|(tick, frame)| frame.map(|f| FrameEvent::new(tick, f)));

        let mut bucketer = LabelBucketer::open(out, &blueprint.commands, &blueprint.output).unwrap();
        let mut reconciler = reconcile(events, commands, blueprint.reconcile.tail_policy);
        for sample in reconciler.by_ref() {
            let sample = sample
                .unwrap()
                .map_frame(|f| resize_frame(&f, blueprint.output.frame_size));
            bucketer.route(&sample).unwrap();
        }
        let stats = reconciler.stats();
        (stats, bucketer.finish().unwrap())
    }

    fn speeds_lines(out: &Path, code: u8) -> Vec<String> {
        fs::read_to_string(out.join(code.to_string()).join("speeds.txt"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn image_names(out: &Path, code: u8) -> BTreeSet<String> {
        let dir = out.join(code.to_string());
        if !dir.is_dir() {
            return BTreeSet::new();
        }
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".jpeg"))
            .collect()
    }

    /// 完整数据流：
    /// 1. 发现会话并读取两个日志
    /// 2. 展开帧计数并与合成视频帧配对
    /// 3. 对齐指令后按指令代码写入各桶
    #[test]
    fn test_e2e_synthetic_session() {
        let input = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_session(
            input.path(),
            "simple",
            0,
            // unordered and with a duplicate tick; last one wins
            "2,1\n0,2\n1,1\n2,1\n",
            "2,left,3,4\n0,forward,1,2\n",
        );

        let mut blueprint = DatasetBlueprint::default();
        blueprint.output.frame_size = FrameSize::new(10, 10);

        let sessions = discover_sessions(input.path(), &SessionLayout::default()).unwrap();
        assert_eq!(sessions.len(), 1);

        let source = SyntheticFrameSource::frames(4, 40, 30);
        let (stats, buckets) = build_session(&sessions[0], &source, &blueprint, out.path());

        assert_eq!(stats.frames, 4);
        assert_eq!(stats.matched, 2);
        assert_eq!(buckets.written, vec![2, 1, 0, 1, 0, 0, 0]);

        assert_eq!(speeds_lines(out.path(), 1), vec!["0.jpeg,1,2"]);
        assert_eq!(speeds_lines(out.path(), 0), vec!["0.jpeg,1,2", "1.jpeg,1,2"]);
        assert_eq!(speeds_lines(out.path(), 3), vec!["0.jpeg,3,4"]);

        let img = image::open(out.path().join("3").join("0.jpeg")).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (10, 10));
        // Fourth synthetic frame has intensity 3; JPEG keeps flat frames close
        let pixel = img.get_pixel(5, 5)[0] as i32;
        assert!((pixel - SyntheticFrameSource::intensity(3) as i32).abs() <= 2);
    }

    /// 第二次运行在同一输出目录上续写编号
    #[test]
    fn test_e2e_second_run_resumes_numbering() {
        let input = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_session(input.path(), "simple", 0, "0,3\n", "0,forward,5,5\n");
        write_session(input.path(), "simple", 1, "0,2\n", "0,forward,6,6\n");

        let blueprint = DatasetBlueprint::default();
        let source = SyntheticFrameSource::frames(3, 8, 8);
        let sessions = discover_sessions(input.path(), &SessionLayout::default()).unwrap();

        for session in &sessions {
            build_session(session, &source, &blueprint, out.path());
        }
        let first_run: Vec<_> = (0..7u8).map(|c| image_names(out.path(), c)).collect();

        for session in &sessions {
            build_session(session, &source, &blueprint, out.path());
        }

        // forward: 1 per session per run
        assert_eq!(
            speeds_lines(out.path(), 1),
            vec!["0.jpeg,5,5", "1.jpeg,6,6", "2.jpeg,5,5", "3.jpeg,6,6"]
        );
        // nop: tail frames, 2 + 1 per run
        assert_eq!(image_names(out.path(), 0).len(), 6);

        // Nothing from the first run disappeared
        for (code, names) in first_run.iter().enumerate() {
            assert!(names.is_subset(&image_names(out.path(), code as u8)));
        }
    }

    /// 随机会话：每一行 speeds 都对应唯一且存在的图像
    #[test]
    fn test_e2e_random_sessions_round_trip() {
        let mut rng = rand::rng();
        let labels = ["forward", "backward", "left", "right", "None", "dance"];

        let input = tempdir().unwrap();
        let out = tempdir().unwrap();
        let mut expected_frames = Vec::new();

        for index in 0..4u64 {
            let ticks = rng.random_range(1..12u64);
            let mut sync = String::new();
            let mut commands = String::new();
            let mut total = 0;
            for tick in 0..ticks {
                let count = rng.random_range(0..4u64);
                total += count;
                sync.push_str(&format!("{tick},{count}\n"));
                if rng.random_bool(0.6) {
                    let label = labels[rng.random_range(0..labels.len())];
                    let l: i32 = rng.random_range(-255..=255);
                    let r: i32 = rng.random_range(-255..=255);
                    commands.push_str(&format!("{tick},{label},{l},{r}\n"));
                }
            }
            write_session(input.path(), "rand", index, &sync, &commands);
            expected_frames.push(total);
        }

        let blueprint = DatasetBlueprint::default();
        let source = SyntheticFrameSource::frames(1_000, 8, 8);
        let sessions = discover_sessions(input.path(), &SessionLayout::default()).unwrap();

        let mut run = RunAggregator::new();
        for (session, expected) in sessions.iter().zip(&expected_frames) {
            let (stats, buckets) = build_session(session, &source, &blueprint, out.path());
            assert_eq!(stats.frames, *expected, "{session}");
            assert_eq!(buckets.total(), *expected);
            run.record_success(&contracts::SessionReport {
                session: session.to_string(),
                reconcile: stats,
                buckets,
                missing_frames: 0,
            });
        }

        let summary = run.summary();
        let total: u64 = expected_frames.iter().sum();
        assert_eq!(summary.total_frames, total);
        assert_eq!(summary.bucket_totals.iter().sum::<u64>(), total);

        for code in 0..7u8 {
            let lines = speeds_lines(out.path(), code);
            let named: HashSet<String> = lines
                .iter()
                .map(|l| l.split(',').next().unwrap().to_string())
                .collect();
            assert_eq!(named.len(), lines.len());
            let images: HashSet<String> = image_names(out.path(), code).into_iter().collect();
            assert_eq!(named, images, "bucket {code}");
        }
    }

    fn route_all<I>(
        out: &Path,
        blueprint: &DatasetBlueprint,
        events: I,
        commands: Vec<contracts::CommandEvent>,
    ) -> Result<contracts::BucketerStats, contracts::ContractError>
    where
        I: Iterator<Item = Result<FrameEvent<GrayImage>, contracts::ContractError>>,
    {
        let mut bucketer = LabelBucketer::open(out, &blueprint.commands, &blueprint.output)?;
        for sample in reconcile(events, commands, blueprint.reconcile.tail_policy) {
            bucketer.route(&sample?)?;
        }
        bucketer.finish()
    }

    /// 解码失败时已写入的数据仍然完整，句柄被释放
    #[test]
    fn test_e2e_decode_error_mid_stream_keeps_buckets_consistent() {
        let input = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_session(input.path(), "t", 0, "0,2\n1,2\n", "0,forward,1,1\n1,right,2,2\n");
        let sessions = discover_sessions(input.path(), &SessionLayout::default()).unwrap();
        let session = &sessions[0];

        let blueprint = DatasetBlueprint::default();
        let frames: Vec<Result<GrayImage, contracts::ContractError>> = vec![
            Ok(GrayImage::new(8, 8)),
            Ok(GrayImage::new(8, 8)),
            Err(contracts::ContractError::video_decode(&session.video, "corrupt packet")),
        ];

        let counts = read_sync_log(&session.sync).unwrap();
        let commands = read_command_log(&session.commands).unwrap();
        let events = expand_sync_counts(&counts)
            .zip(frames)
            .map(|(tick, frame)| frame.map(|f| FrameEvent::new(tick, f)));

        let result = route_all(out.path(), &blueprint, events, commands);

        assert!(matches!(
            result,
            Err(contracts::ContractError::VideoDecode { .. })
        ));
        assert_eq!(speeds_lines(out.path(), 1), vec!["0.jpeg,1,1"]);
        assert_eq!(speeds_lines(out.path(), 0), vec!["0.jpeg,1,1"]);
        assert!(speeds_lines(out.path(), 4).is_empty());
    }

    /// TOML 配置决定分辨率、扩展名和词表
    #[test]
    fn test_e2e_toml_blueprint_drives_output() {
        let blueprint = config_loader::ConfigLoader::load_from_str(
            r#"
[output]
frame_size = "6x4"
image_extension = "png"
speeds_file = "labels.csv"

[[commands]]
code = 0
label = "idle"
name = "idle"

[[commands]]
code = 1
label = "go"
name = "go"
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let input = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_session(input.path(), "custom", 0, "0,1\n1,1\n", "0,go,2,2\n1,forward,1,1\n");
        let sessions = discover_sessions(input.path(), &blueprint.session).unwrap();

        let source = SyntheticFrameSource::frames(2, 32, 32);
        let counts = read_sync_log(&sessions[0].sync).unwrap();
        let commands = read_command_log(&sessions[0].commands).unwrap();
        let frames = source.open(&sessions[0].video).unwrap();
        let events = expand_sync_counts(&counts).zip(frames).map(|(tick, frame)| {
            frame.map(|f| FrameEvent::new(tick, resize_frame(&f, blueprint.output.frame_size)))
        });

        let stats = route_all(out.path(), &blueprint, events, commands).unwrap();
        // "forward" is outside this vocabulary
        assert_eq!(stats.written, vec![1, 1]);
        assert_eq!(stats.unknown_labels, 1);
        assert!(!out.path().join("2").exists());

        let log = fs::read_to_string(out.path().join("1").join("labels.csv")).unwrap();
        assert_eq!(log, "0.png,2,2\n");
        let img = image::open(out.path().join("0").join("0.png")).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (6, 4));
        assert_eq!(img.get_pixel(0, 0)[0], SyntheticFrameSource::intensity(1));
    }
}
