use anyhow::{Context, Result};
use binlog_analysis::config::Config;
use binlog_analysis::decoder::{DecodeOptions, RowVerbosity};
use binlog_analysis::logging::{LogConfig, init_logging, verbosity_level};
use binlog_analysis::process::{BinlogSource, analyze_binlogs, extract_sql};
use binlog_analysis::report::{format_reports, write_report_text, write_sql_file};
use binlog_analysis::{FlashbackMode, KeyFilter};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(name = "binlog-cli", version)]
#[command(about = "MySQL binlog 统计分析与闪回 SQL 生成工具", long_about = None)]
struct Cli {
    /// 配置文件路径 (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// 输入是已经解码好的文本，不再调用 mysqlbinlog
    #[arg(long, global = true)]
    decoded: bool,
    /// 输出详细程度 (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// 只输出错误日志
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 按表统计 binlog 中的变更
    Analyze {
        /// binlog 文件
        #[arg(required = true)]
        binlogs: Vec<PathBuf>,
        /// 开始时间
        #[arg(long)]
        start_datetime: Option<String>,
        /// 结束时间
        #[arg(long)]
        stop_datetime: Option<String>,
        /// 数据库名过滤
        #[arg(long)]
        database: Option<String>,
        /// 表名过滤
        #[arg(long)]
        table: Option<String>,
        /// 统计报告输出文件
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 提取行级变更并生成闪回 SQL
    Extract {
        /// binlog 文件路径
        #[arg(long)]
        binlog_file: PathBuf,
        /// 数据库名过滤
        #[arg(long)]
        database: Option<String>,
        /// 表名过滤
        #[arg(long)]
        table: Option<String>,
        /// 开始位置
        #[arg(long)]
        start_position: Option<u64>,
        /// 结束位置
        #[arg(long)]
        stop_position: Option<u64>,
        /// 开始时间
        #[arg(long)]
        start_datetime: Option<String>,
        /// 结束时间
        #[arg(long)]
        stop_datetime: Option<String>,
        /// 输出文件，未指定时输出到标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// 直接解析模式：先把解码输出写入临时文件
        #[arg(long)]
        direct_parse: bool,
        /// 闪回模式 (deletes, updates, inserts)
        #[arg(long)]
        flashback_mode: Option<FlashbackMode>,
    },
}

fn init_cli_logging(
    config: &Config,
    verbose: u8,
    quiet: bool,
) -> Result<Option<WorkerGuard>> {
    let mut log_config = LogConfig::from_config(&config.log)?;
    if let Some(level) = verbosity_level(verbose, quiet) {
        log_config.level = level;
    }
    Ok(init_logging(&log_config)?)
}

fn merge_filter(
    config: &Config,
    database: Option<String>,
    table: Option<String>,
) -> KeyFilter {
    KeyFilter::new(
        database.or_else(|| config.filter.database.clone()),
        table.or_else(|| config.filter.table.clone()),
    )
}

fn make_source(
    config: &Config,
    path: PathBuf,
    decoded: bool,
    options: DecodeOptions,
    direct: bool,
) -> BinlogSource {
    if decoded {
        return BinlogSource::Decoded(path);
    }
    BinlogSource::Binary {
        path,
        binary: config.decoder.mysqlbinlog_path.clone(),
        options: options.extra_args(config.decoder.extra_args.clone()),
        direct,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("无法加载配置文件: {}", path.display()))?,
        None => Config::default(),
    };
    let _guard = init_cli_logging(&config, cli.verbose, cli.quiet)?;

    match cli.command {
        Commands::Analyze {
            binlogs,
            start_datetime,
            stop_datetime,
            database,
            table,
            output,
        } => {
            let options = DecodeOptions::new()
                .datetime_range(start_datetime, stop_datetime)
                .verbose_rows(RowVerbosity::VeryVerbose);
            let sources: Vec<_> = binlogs
                .into_iter()
                .map(|path| make_source(&config, path, cli.decoded, options.clone(), false))
                .collect();
            let filter = merge_filter(&config, database, table);

            let reports = analyze_binlogs(&sources, &filter)?;
            let text = format_reports(
                reports.iter().map(|r| (r.label.as_str(), &r.outcome.stats)),
            );
            let output = output.unwrap_or_else(|| PathBuf::from(&config.report.output));
            write_report_text(&output, &text)?;
            println!("统计报告已生成: {}", output.display());
        }
        Commands::Extract {
            binlog_file,
            database,
            table,
            start_position,
            stop_position,
            start_datetime,
            stop_datetime,
            output,
            direct_parse,
            flashback_mode,
        } => {
            let options = DecodeOptions::new()
                .datetime_range(start_datetime, stop_datetime)
                .position_range(start_position, stop_position);
            let source =
                make_source(&config, binlog_file, cli.decoded, options, direct_parse);
            let filter = merge_filter(&config, database, table);
            let mode = flashback_mode.unwrap_or(config.flashback.mode);

            let extraction = extract_sql(&source, filter, mode)?;
            let output =
                output.or_else(|| config.flashback.output.as_ref().map(PathBuf::from));
            match output {
                Some(path) => {
                    write_sql_file(&path, &extraction.statements, mode)?;
                    eprintln!("SQL已保存到: {}", path.display());
                }
                None => {
                    for sql in &extraction.statements {
                        println!("{sql}");
                    }
                }
            }
        }
    }

    Ok(())
}
