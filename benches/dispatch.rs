//! Benchmarks for line dispatch and state tracking.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use slirc_client::{ClientConfig, Line, Parser};

const PRIVMSG: &str = ":nick!user@host PRIVMSG #channel :Hello, world!";

const TAGGED: &str = "@time=2023-01-01T12:00:00Z;msgid=msg-12345;account=username :nick!user@host.example.com PRIVMSG #channel :This is a longer message with more content to parse";

const MODE: &str = ":op!o@h MODE #channel +ovb-v alice bob *!*@spam.host carol";

fn registered() -> Parser {
    let mut parser = Parser::new(ClientConfig::new("me")).unwrap();
    parser.connecting().unwrap();
    parser.connected().unwrap();
    parser.dispatch(":irc.test 001 me :Welcome");
    parser.dispatch(":irc.test 005 me PREFIX=(qaohv)~&@%+ CHANMODES=beI,k,l,imnpst :are supported");
    parser.dispatch(":me!u@h JOIN #channel");
    parser.dispatch(":irc.test 353 me = #channel :me alice bob carol nick");
    parser.dispatch(":irc.test 366 me #channel :End of /NAMES list.");
    parser.take_outbound();
    parser
}

fn benchmark_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("Tokenize");

    group.bench_function("privmsg", |b| {
        b.iter(|| black_box(Line::parse(black_box(PRIVMSG)).unwrap()))
    });

    group.bench_function("tagged", |b| {
        b.iter(|| black_box(Line::parse(black_box(TAGGED)).unwrap()))
    });

    group.finish();
}

fn benchmark_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("Dispatch");

    group.bench_function("channel_message", |b| {
        let mut parser = registered();
        b.iter(|| parser.dispatch(black_box(PRIVMSG)))
    });

    group.bench_function("mode_change", |b| {
        let mut parser = registered();
        b.iter(|| parser.dispatch(black_box(MODE)))
    });

    group.finish();
}

fn benchmark_names(c: &mut Criterion) {
    let mut group = c.benchmark_group("Names");

    for size in [10usize, 100, 1000] {
        let names: Vec<String> = (0..size).map(|i| format!("@user{i}")).collect();
        let line = format!(":irc.test 353 me = #big :{}", names.join(" "));
        group.bench_with_input(BenchmarkId::from_parameter(size), &line, |b, line| {
            b.iter(|| {
                let mut parser = registered();
                parser.dispatch(":me!u@h JOIN #big");
                parser.dispatch(black_box(line));
                black_box(parser.state().channel("#big").map(|c| c.member_count()))
            })
        });
    }

    group.finish();
}

fn benchmark_ban_list(c: &mut Criterion) {
    let lines: Vec<String> = (0..200)
        .map(|i| format!(":irc.test 367 me #channel *!*@host{i}.example op 1700000000"))
        .collect();

    c.bench_function("ban_list_refresh_200", |b| {
        let mut parser = registered();
        b.iter(|| {
            for line in &lines {
                parser.dispatch(line);
            }
            parser.dispatch(":irc.test 368 me #channel :End of Channel Ban List");
        })
    });
}

criterion_group!(
    benches,
    benchmark_tokenize,
    benchmark_dispatch,
    benchmark_names,
    benchmark_ban_list
);
criterion_main!(benches);
