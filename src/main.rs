fn main() {
    if let Err(err) = mega2cv::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
