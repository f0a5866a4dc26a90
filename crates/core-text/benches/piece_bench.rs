use core_text::{Content, PieceBuffer, RuneView};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn typing_burst(c: &mut Criterion) {
    c.bench_function("typing_burst_coalesced", |b| {
        b.iter(|| {
            let mut buf = PieceBuffer::new(Content::Empty);
            for i in 0..1_000 {
                buf.insert(i, b"x").unwrap();
            }
            black_box(buf.size())
        })
    });
}

fn scattered_edits(c: &mut Criterion) {
    let base = "lorem ipsum dolor sit amet\n".repeat(200);
    c.bench_function("scattered_edits", |b| {
        b.iter(|| {
            let mut buf = PieceBuffer::new(Content::from(base.as_str()));
            for i in 0..100 {
                let pos = (i * 53) % buf.size();
                buf.commit_changes();
                buf.insert(pos, b"edit ").unwrap();
            }
            black_box(buf.size())
        })
    });
}

fn undo_redo_walk(c: &mut Criterion) {
    c.bench_function("undo_redo_walk", |b| {
        b.iter(|| {
            let mut buf = PieceBuffer::new(Content::from("seed text"));
            for i in 0..100 {
                buf.commit_changes();
                buf.insert(i, b"y").unwrap();
            }
            while buf.undo().is_some() {}
            while buf.redo().is_some() {}
            black_box(buf.size())
        })
    });
}

fn sequential_rune_scan(c: &mut Criterion) {
    let text = "päällekkäisyys 漢字 and plain ascii\n".repeat(100);
    c.bench_function("sequential_rune_scan", |b| {
        b.iter(|| {
            let mut view = RuneView::from_content(Content::from(text.as_str()));
            let mut count = 0usize;
            let mut q = 0;
            while view.rune_at(q).is_some() {
                q += 1;
                count += 1;
            }
            black_box(count)
        })
    });
}

criterion_group!(
    benches,
    typing_burst,
    scattered_edits,
    undo_redo_walk,
    sequential_rune_scan
);
criterion_main!(benches);
