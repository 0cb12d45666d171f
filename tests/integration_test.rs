use colorcrypt::chunk;
use colorcrypt::codec::{self, CodecError, DecodedFile};
use colorcrypt::header::{PLAIN_HEADER_LEN, SIGNATURE_ENCRYPTED, SIGNATURE_PLAIN};
use colorcrypt::png_io;
use std::fs::File;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn test_png_file_roundtrip() {
    let temp_file = NamedTempFile::new().unwrap();
    let image_path = temp_file.path().to_path_buf();

    let test_data = b"Hello, ColorCrypt format!";
    let file_name = "test.txt";

    {
        let image = codec::encode(test_data, file_name, None).unwrap();
        png_io::write_png(&image, &image_path).unwrap();
    }

    {
        let image = png_io::read_png(&image_path).unwrap();
        let decoded = codec::decode(&image, None).unwrap();
        assert_eq!(decoded.file_bytes, test_data);
        assert_eq!(decoded.file_name, file_name);
    }
}

#[test]
fn test_encrypted_png_file_roundtrip() {
    let temp_file = NamedTempFile::new().unwrap();
    let image_path = temp_file.path().to_path_buf();

    let test_data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

    {
        let image = codec::encode(&test_data, "numbers.bin", Some("s3cret")).unwrap();
        png_io::write_png(&image, &image_path).unwrap();
    }

    {
        let image = png_io::read_png(&image_path).unwrap();
        assert!(matches!(codec::decode(&image, None), Err(CodecError::PasswordRequired)));

        let decoded = codec::decode(&image, Some("s3cret")).unwrap();
        assert_eq!(decoded.file_bytes, test_data);
        assert_eq!(decoded.file_name, "numbers.bin");
    }
}

#[test]
fn test_signature_is_first_two_channels() {
    let plain = codec::encode(b"x", "x", None).unwrap();
    assert_eq!(&plain.as_raw()[..2], SIGNATURE_PLAIN);

    let encrypted = codec::encode(b"x", "x", Some("pw")).unwrap();
    assert_eq!(&encrypted.as_raw()[..2], SIGNATURE_ENCRYPTED);
}

#[test]
fn test_layout_matches_reference_bytes() {
    // "ER", u64 LE length, name field, SHA-1 of "abc", then the body.
    let image = codec::encode(b"abc", "abc.txt", None).unwrap();
    let raw = image.as_raw();
    assert_eq!(image.dimensions(), (9, 9));
    assert_eq!(&raw[2..10], &3u64.to_le_bytes());
    assert_eq!(&raw[10..17], b"abc.txt");
    assert_eq!(
        hex::encode(&raw[266..286]),
        "a9993e364706816aba3e25717850c26c9cd0d89d"
    );
    assert_eq!(&raw[PLAIN_HEADER_LEN..PLAIN_HEADER_LEN + 3], b"abc");
}

#[test]
fn test_non_colorcrypt_png_is_rejected() {
    let image = image::RgbaImage::from_pixel(20, 20, image::Rgba([10, 20, 30, 255]));
    let png = png_io::to_png_bytes(&image).unwrap();
    assert!(matches!(
        codec::decode_png(&png, None),
        Err(CodecError::UnrecognizedFormat(_))
    ));
}

#[test]
fn test_truncated_png_file() {
    let png = codec::encode_to_png(&[7u8; 4096], "seven.bin", None).unwrap();

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(&png[..png.len() / 2]).unwrap();
    temp_file.flush().unwrap();

    let err = png_io::read_png(temp_file.path()).unwrap_err();
    assert!(matches!(err, png_io::PngError::Image(_)));
}

#[test]
fn test_chunked_files_roundtrip() {
    let dir = tempdir().unwrap();
    let data: Vec<u8> = (0..5000u32).map(|i| (i * 31 % 256) as u8).collect();

    let pieces = chunk::split(&data, 1024, 10).unwrap();
    assert_eq!(pieces.len(), 5);

    let mut paths = Vec::new();
    for (i, piece) in pieces.iter().enumerate() {
        let name = chunk::part_name("big.dat", i, pieces.len());
        let image = codec::encode(piece, &name, Some("pw")).unwrap();
        let path = dir.path().join(format!("big.{i}.png"));
        png_io::write_png(&image, &path).unwrap();
        paths.push(path);
    }

    // Decode in reverse, mixed with an unrelated single image.
    let solo = dir.path().join("solo.png");
    png_io::write_png(&codec::encode(b"solo", "solo.txt", Some("pw")).unwrap(), &solo).unwrap();
    paths.reverse();
    paths.insert(2, solo);

    let decoded: Vec<DecodedFile> = paths
        .iter()
        .map(|p| codec::decode(&png_io::read_png(p).unwrap(), Some("pw")).unwrap())
        .collect();
    let files = chunk::collect(decoded).unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].file_name, "big.dat");
    assert_eq!(files[0].file_bytes, data);
    assert_eq!(files[1].file_name, "solo.txt");
    assert_eq!(files[1].file_bytes, b"solo");
}

#[test]
fn test_tampered_png_is_detected() {
    let temp_file = NamedTempFile::new().unwrap();
    let image_path = temp_file.path().to_path_buf();

    let image = codec::encode(b"integrity matters", "i.txt", None).unwrap();
    let mut raw = image.as_raw().clone();
    raw[PLAIN_HEADER_LEN + 5] ^= 0x80;
    let tampered = image::RgbaImage::from_raw(image.width(), image.height(), raw).unwrap();
    png_io::write_png(&tampered, &image_path).unwrap();

    let reread = png_io::read_png(&image_path).unwrap();
    assert!(matches!(codec::decode(&reread, None), Err(CodecError::IntegrityMismatch)));
}

#[test]
fn test_written_file_is_a_png() {
    let temp_file = NamedTempFile::new().unwrap();
    let image = codec::encode(b"magic", "m", None).unwrap();
    png_io::write_png(&image, temp_file.path()).unwrap();

    let mut header = [0u8; 8];
    std::io::Read::read_exact(&mut File::open(temp_file.path()).unwrap(), &mut header).unwrap();
    assert_eq!(header, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
}
