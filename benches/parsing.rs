use criterion::{criterion_group, criterion_main, Criterion};

use maildir2pdf::parser::decode::decode_body;
use maildir2pdf::parser::message::Message;
use maildir2pdf::parser::mime::{find_pdf_parts, MAX_DEPTH};

fn sample_message() -> Vec<u8> {
    let payload: String = "JVBERi0xLjQKJeLjz9MK"
        .repeat(2000)
        .as_bytes()
        .chunks(76)
        .map(|c| std::str::from_utf8(c).unwrap())
        .collect::<Vec<_>>()
        .join("\r\n");

    format!(
        "From: bench@example.com\r\n\
         Date: Mon, 02 Jan 2006 15:04:05 -0700\r\n\
         Content-Type: multipart/mixed; boundary=outer\r\n\
         \r\n\
         --outer\r\n\
         Content-Type: multipart/alternative; boundary=inner\r\n\
         \r\n\
         --inner\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         Hello\r\n\
         --inner--\r\n\
         --outer\r\n\
         Content-Type: application/pdf; name=\"bench.pdf\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         {payload}\r\n\
         --outer--\r\n"
    )
    .into_bytes()
}

fn bench_find_pdf_parts(c: &mut Criterion) {
    let raw = sample_message();

    c.bench_function("parse_and_find_pdf_parts", |b| {
        b.iter(|| {
            let message = Message::parse(&raw).unwrap();
            find_pdf_parts(&message, MAX_DEPTH).len()
        })
    });
}

fn bench_decode(c: &mut Criterion) {
    let raw = sample_message();
    let message = Message::parse(&raw).unwrap();
    let parts = find_pdf_parts(&message, MAX_DEPTH);
    let part = parts[0].as_ref().unwrap();

    c.bench_function("decode_base64_part", |b| {
        b.iter(|| decode_body(part.body, &part.encoding, false).unwrap().len())
    });
}

criterion_group!(benches, bench_find_pdf_parts, bench_decode);
criterion_main!(benches);
