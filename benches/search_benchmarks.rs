use criterion::{black_box, criterion_group, criterion_main, Criterion};

use obsidian::eval::evaluate;
use obsidian::position::Position;
use obsidian::search::{SearchSettings, Searcher};

fn bench_evaluate(c: &mut Criterion) {
    let startpos = Position::startpos();
    let middlegame =
        Position::from_fen("r1bq1rk1/pp2bppp/2n1pn2/3p4/3P4/2NBPN2/PP3PPP/R1BQ1RK1 w - - 0 1")
            .unwrap();

    c.bench_function("evaluate_startpos", |b| {
        b.iter(|| evaluate(black_box(startpos.board())));
    });
    c.bench_function("evaluate_middlegame", |b| {
        b.iter(|| evaluate(black_box(middlegame.board())));
    });
}

fn bench_search(c: &mut Criterion) {
    c.bench_function("search_startpos_depth_4", |b| {
        b.iter(|| {
            let mut pos = Position::startpos();
            let mut searcher = Searcher::new(16).expect("cache");
            searcher.search(&mut pos, &SearchSettings::depth(4))
        });
    });

    c.bench_function("search_tactics_depth_5", |b| {
        b.iter(|| {
            let mut pos = Position::from_fen(
                "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 0 4",
            )
            .expect("valid FEN");
            let mut searcher = Searcher::new(16).expect("cache");
            searcher.search(&mut pos, &SearchSettings::depth(5))
        });
    });
}

criterion_group!(benches, bench_evaluate, bench_search);
criterion_main!(benches);
