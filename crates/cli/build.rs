use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("broadsheet")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert news article URLs read from stdin into PDF files")
        .arg(
            clap::arg!(-d --dir <DIR> "Base directory output files are written under")
                .default_value(".")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(-p --"http-proxy" <URL> "HTTP(S) proxy, credentials may be given as user:password@"))
        .arg(clap::arg!(-t --"text-only" "Leave out the thumbnail, the webpage link and other imagery"))
        .arg(clap::arg!(--"url-prefix" <PREFIX> "Prefix printed before each output path").default_value(""))
        .arg(clap::arg!(-v --verbose "Print progress and human-readable results").conflicts_with("quiet"))
        .arg(clap::arg!(-q --quiet "Print nothing on stdout"))
        .arg(
            clap::arg!(--fonts <DIR> "Directory holding MiloTE.ttf, MiloTE-inclined.ttf and an optional fallback.ttf")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--assets <DIR> "Directory holding logo.png and audio.png")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "broadsheet", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "broadsheet", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "broadsheet", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "broadsheet", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
