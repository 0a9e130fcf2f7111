use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gesture-studio")]
#[command(about = "ジェスチャー収集・リアルタイム予測・モデル再学習クライアント", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// ログインしてトークンを保存
    Login {
        /// メールアドレス
        #[arg(required = true)]
        email: String,

        /// パスワード（省略時は入力を求める）
        #[arg(long)]
        password: Option<String>,
    },

    /// アカウントを作成
    Signup {
        /// メールアドレス
        #[arg(required = true)]
        email: String,

        /// パスワード（省略時は入力を求める）
        #[arg(long)]
        password: Option<String>,
    },

    /// 保存済みトークンを削除
    Logout,

    /// 登録済みジェスチャーを一覧表示
    List,

    /// ジェスチャーを削除
    Delete {
        /// ジェスチャー名
        #[arg(required = true)]
        name: String,

        /// 確認せずに削除
        #[arg(short, long)]
        yes: bool,
    },

    /// 割り当て可能なアクションを表示
    Actions,

    /// ガイド付き撮影でジェスチャーを登録
    Collect {
        /// ジェスチャー名
        #[arg(required = true)]
        name: String,

        /// 割り当てるアクション（`actions` で一覧表示）
        #[arg(short, long)]
        action: String,

        /// カメラ代わりに読み込む画像フォルダ
        #[arg(short, long)]
        frames: PathBuf,
    },

    /// リアルタイム予測（Ctrl+Cで終了）
    Predict {
        /// カメラ代わりに読み込む画像フォルダ
        #[arg(short, long)]
        frames: PathBuf,

        /// 指定秒数で終了
        #[arg(short, long)]
        seconds: Option<u64>,
    },

    /// モデルを再学習
    Retrain,

    /// 設定を表示/編集
    Config {
        /// バックエンドのベースURLを設定
        #[arg(long)]
        set_base_url: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
