use colored::Colorize;

use super::generator::MiningStats;


const WIDTH: usize = 10;
const PREC_WIDTH: usize = 4;


pub(super) fn print_header() {
    println!(
        "       {:>WIDTH$}\t{:>WIDTH$}\t{:>WIDTH$}\t{:>WIDTH$}\t{:>WIDTH$}",
        "FOUND".bold().red(),
        "REQUEST".bold().blue(),
        "BG".bold().green(),
        "CARTS".bold().yellow(),
        "TIME".bold().cyan(),
    );
}


pub(super) fn print_round(stats: &MiningStats, found: usize, n_backgrounds: usize) {
    let tag = if found >= stats.requested {
        "[DONE]".bold().bright_green()
    } else {
        "[MINE]".bold().bright_red()
    };
    println!(
        "{} {}\t{}\t{}\t{}\t{}",
        tag,
        format!("{:>WIDTH$}", found).bold().red(),
        format!("{:>WIDTH$}", stats.requested).blue(),
        format!("{:>WIDTH$}", format!("{}/{}", stats.bg_used, n_backgrounds)).green(),
        format!("{:>WIDTH$}", stats.carts_n).yellow(),
        time_format(stats.elapsed.as_millis()).bold().cyan(),
    );
    if found < stats.requested {
        println!(
            "       {} {:.PREC_WIDTH$}",
            "backgrounds exhausted, ratio".yellow(),
            stats.ratio,
        );
    }
}


fn time_format(millisec: u128) -> String {
    if millisec < 1_000 {
        return format!("  0.{:0>3}s", millisec);
    }
    let sec = millisec / 1_000;
    let millisec = millisec % 1_000;
    if sec < 60 {
        return format!(" {:0>2}.{:0>3}s", sec, millisec);
    }
    let min = sec / 60;
    let sec = sec % 60;
    if min < 60 {
        return format!(" {:0>2}m {:0>2}s", min, sec);
    }
    let hours = min / 60;
    let min = min % 60;
    format!(" {:0>2}h {:0>2}m", hours, min)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_unit() {
        assert_eq!(time_format(42), "  0.042s");
        assert_eq!(time_format(3_500), " 03.500s");
        assert_eq!(time_format(125_000), " 02m 05s");
        assert_eq!(time_format(7_260_000), " 02h 01m");
    }
}
